//! # Lingerpool Core
//!
//! Keyed, reference-counted connection pool with idle eviction.
//!
//! Connections are created lazily through a pluggable [`ConnectionFactory`]
//! on the first request for an id, shared between every caller asking for the
//! same id, and dropped once nobody references them and they have lingered
//! idle for longer than the configured time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ConnectionPool                           │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │  Mutex<HashMap<id, Arc<ConnectionHandle>>>               │   │
//! │  │                                                          │   │
//! │  │  "db-primary:5432" → handle (ref_count 2)                │   │
//! │  │  "search:2767"     → handle (ref_count 0, idle 4s)       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │          ▲ get / release / report_error        ▲ evict_idle     │
//! └──────────┼─────────────────────────────────────┼────────────────┘
//!            │ miss                                │
//!            ▼                                     │
//! ┌──────────────────────┐              ┌──────────────────────┐
//! │  ConnectionFactory   │              │      ReaperLoop      │
//! │  TCP or closure      │              │  sleep(linger), scan │
//! └──────────────────────┘              └──────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lingerpool_core::{ConnectionPool, FnFactory};
//!
//! let factory = FnFactory::new(|id: String| async move { Ok(Some(connect(&id).await?)) });
//! let pool = ConnectionPool::new(Arc::new(factory), 10)?;
//!
//! if let Some(handle) = pool.get("//localhost:2767/ping_service").await? {
//!     match handle.connection().ping().await {
//!         Ok(reply) => println!("Ping response: {}", reply),
//!         Err(e) => pool.report_error(&handle, e).await,
//!     }
//!     pool.release(&handle)?;
//! }
//!
//! pool.close().await;
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod guard;
pub mod handle;
pub mod pool;
mod reaper;

pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use factory::{ConnectionFactory, FnFactory};
pub use guard::PooledConnection;
pub use handle::ConnectionHandle;
pub use pool::{ConnectionPool, PoolStats};
