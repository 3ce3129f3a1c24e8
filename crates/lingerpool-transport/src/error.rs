//! Transport errors

use std::time::Duration;

use thiserror::Error;

/// Errors raised while creating or using a transport connection
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection id does not name a usable endpoint
    #[error("Invalid endpoint '{id}': {reason}")]
    InvalidEndpoint { id: String, reason: String },

    /// The connection id uses a scheme this backend does not speak
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The remote did not accept the connection in time
    #[error("Timed out after {timeout:?} connecting to {endpoint}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    /// The remote closed the connection
    #[error("Connection to {0} closed by peer")]
    ConnectionClosed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
