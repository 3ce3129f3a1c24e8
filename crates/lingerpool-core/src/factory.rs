//! Connection factory
//!
//! The pool never talks to a transport itself. Backends implement
//! [`ConnectionFactory`] and are injected when the pool is built.

use std::future::Future;

use anyhow::Result;
use async_trait::async_trait;

/// Creates connection values for the pool
///
/// `Ok(None)` means "no connection available for this id right now". The pool
/// treats it exactly like an `Err`: nothing is cached and the caller receives
/// no handle. Implementations must not hold on to pool state.
#[async_trait]
pub trait ConnectionFactory<C>: Send + Sync {
    /// Create a new connection for `id`
    async fn create_connection(&self, id: &str) -> Result<Option<C>>;
}

/// Adapts an async closure into a [`ConnectionFactory`]
///
/// ```rust,ignore
/// let factory = FnFactory::new(|id: String| async move {
///     Ok::<_, anyhow::Error>(Some(format!("connection to {}", id)))
/// });
/// let pool = ConnectionPool::new(Arc::new(factory), 10)?;
/// ```
pub struct FnFactory<F> {
    create_fn: F,
}

impl<F> FnFactory<F> {
    pub fn new(create_fn: F) -> Self {
        Self { create_fn }
    }
}

#[async_trait]
impl<C, F, Fut> ConnectionFactory<C> for FnFactory<F>
where
    C: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<C>>> + Send + 'static,
{
    async fn create_connection(&self, id: &str) -> Result<Option<C>> {
        (self.create_fn)(id.to_string()).await
    }
}
