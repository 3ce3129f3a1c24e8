//! Scoped acquisition
//!
//! [`PooledConnection`] pairs a `get` with its `release`: the reference is
//! given back when the guard goes out of scope, on every exit path.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::handle::ConnectionHandle;
use crate::pool::{release_handle, PoolShared};

/// A borrowed connection that releases its reference on drop
pub struct PooledConnection<C> {
    handle: Arc<ConnectionHandle<C>>,
    shared: Arc<PoolShared<C>>,
}

impl<C> PooledConnection<C> {
    pub(crate) fn new(handle: Arc<ConnectionHandle<C>>, shared: Arc<PoolShared<C>>) -> Self {
        Self { handle, shared }
    }

    /// The underlying handle
    pub fn handle(&self) -> &Arc<ConnectionHandle<C>> {
        &self.handle
    }

    pub fn id(&self) -> &str {
        self.handle.id()
    }
}

impl<C> PooledConnection<C>
where
    C: Send + Sync + 'static,
{
    /// Evict the connection from the pool, then release this borrow
    pub async fn report_error(self, cause: impl fmt::Display) {
        let cause = cause.to_string();
        self.shared.report_error(&self.handle, &cause).await;
    }
}

impl<C> Deref for PooledConnection<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.handle.connection()
    }
}

impl<C> fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<C> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        // Underflow is already logged; a guard owns exactly one reference.
        let _ = release_handle(&self.handle);
    }
}
