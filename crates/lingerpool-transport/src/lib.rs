//! # Lingerpool Transport
//!
//! [`ConnectionFactory`](lingerpool_core::ConnectionFactory) backends.
//!
//! - `tcp`: plain TCP connections addressed by `host:port` style ids

pub mod endpoint;
pub mod error;
pub mod tcp;

pub use endpoint::Endpoint;
pub use error::TransportError;
pub use tcp::{TcpConnection, TcpConnectionFactory, TcpFactoryConfig};
