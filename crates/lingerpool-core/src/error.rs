//! Pool errors

use thiserror::Error;

/// Errors returned by pool operations
///
/// A factory that cannot produce a connection is not an error: `get` reports
/// it as `Ok(None)` and leaves the retry decision to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool has been closed
    #[error("Pool is closed")]
    Closed,

    /// A caller passed an unusable argument (e.g. an empty connection id)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `release` was called more times than `get` for the same handle
    #[error("Ref count underflow on connection '{id}'")]
    RefCountUnderflow { id: String },

    /// The pool was constructed outside a tokio runtime
    #[error("No tokio runtime available to run the reaper")]
    NoRuntime,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;
