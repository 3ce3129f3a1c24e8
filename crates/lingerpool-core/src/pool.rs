//! Connection Pool
//!
//! Keyed cache of connections created on demand by a [`ConnectionFactory`].
//!
//! - `get` looks up the handle for an id, creating it through the factory on a
//!   miss, and takes one reference
//! - `release` gives the reference back
//! - `report_error` drops the entry for an id so the next `get` reconnects
//! - a background reaper drops entries that are unreferenced and have been
//!   idle for longer than the linger time
//!
//! Table lookups, inserts, removals and every 0 -> 1 ref count transition
//! happen while holding the pool's state mutex, so the reaper can never drop
//! a handle that a concurrent `get` is about to hand out. The factory is
//! awaited while that mutex is held: at most one connection is created per id,
//! at the cost of serializing slow creations.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PoolConfig;
use crate::error::{PoolError, PoolResult};
use crate::factory::ConnectionFactory;
use crate::guard::PooledConnection;
use crate::handle::ConnectionHandle;
use crate::reaper::ReaperLoop;

/// Snapshot of pool occupancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Cached handles
    pub handles: usize,
    /// Handles with at least one outstanding borrow
    pub referenced: usize,
    /// Handles nobody currently borrows
    pub idle: usize,
    /// Current linger time
    pub linger_seconds: i64,
    /// Whether the pool has been closed
    pub closed: bool,
}

struct PoolState<C> {
    table: HashMap<String, Arc<ConnectionHandle<C>>>,
    linger_seconds: i64,
    closed: bool,
}

/// State shared between the pool, its guards and the reaper task
pub(crate) struct PoolShared<C> {
    factory: Arc<dyn ConnectionFactory<C>>,
    state: Mutex<PoolState<C>>,
    min_reap_interval: Duration,
    pub(crate) wake: Notify,
    pub(crate) cancel: CancellationToken,
}

impl<C> PoolShared<C>
where
    C: Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> PoolResult<Option<Arc<ConnectionHandle<C>>>> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(PoolError::Closed);
        }

        if id.is_empty() {
            return Err(PoolError::InvalidArgument(
                "connection id is empty".to_string(),
            ));
        }

        if let Some(handle) = state.table.get(id) {
            let ref_count = handle.retain();
            debug!(id = %id, ref_count, "[ConnectionPool] Found connection in cache");
            return Ok(Some(Arc::clone(handle)));
        }

        debug!(id = %id, "[ConnectionPool] No connection in cache, creating");
        let connection = match self.factory.create_connection(id).await {
            Ok(Some(connection)) => connection,
            Ok(None) => {
                debug!(id = %id, "[ConnectionPool] Factory has no connection available");
                return Ok(None);
            }
            Err(e) => {
                warn!(id = %id, error = %e, "[ConnectionPool] Failed to create connection");
                return Ok(None);
            }
        };

        let handle = Arc::new(ConnectionHandle::new(id.to_string(), connection));
        handle.retain();
        state.table.insert(id.to_string(), Arc::clone(&handle));
        info!(id = %id, cached = state.table.len(), "[ConnectionPool] Created connection");

        Ok(Some(handle))
    }

    pub(crate) async fn report_error(&self, handle: &ConnectionHandle<C>, cause: &str) {
        let mut state = self.state.lock().await;
        match state.table.remove(handle.id()) {
            Some(_) => warn!(
                id = %handle.id(),
                error = %cause,
                "[ConnectionPool] Error reported, removing connection"
            ),
            None => debug!(
                id = %handle.id(),
                error = %cause,
                "[ConnectionPool] Error reported on connection no longer cached"
            ),
        }
    }

    /// Drop every unreferenced handle idle for longer than the linger time
    pub(crate) async fn evict_idle(&self) -> usize {
        let mut state = self.state.lock().await;
        if state.closed {
            return 0;
        }

        let now = Instant::now();
        let linger_seconds = state.linger_seconds;
        let before = state.table.len();

        state.table.retain(|id, handle| {
            if handle.is_evictable(linger_seconds, now) {
                debug!(
                    id = %id,
                    idle = ?now.saturating_duration_since(handle.last_used()),
                    linger_seconds,
                    "[ConnectionPool] Connection reached idle timeout"
                );
                false
            } else {
                true
            }
        });

        let evicted = before - state.table.len();
        if evicted > 0 {
            debug!(evicted, remaining = state.table.len(), "[ConnectionPool] Purged idle connections");
        }
        evicted
    }

    /// Sleep before the next reaper pass, or `None` once the pool is closed
    pub(crate) async fn reap_interval(&self) -> Option<Duration> {
        let state = self.state.lock().await;
        if state.closed {
            return None;
        }
        let linger = Duration::from_secs(u64::try_from(state.linger_seconds).unwrap_or(0));
        Some(linger.max(self.min_reap_interval))
    }
}

/// End one borrow of `handle`, logging an underflow loudly
pub(crate) fn release_handle<C>(handle: &ConnectionHandle<C>) -> PoolResult<usize> {
    match handle.unref() {
        Ok(ref_count) => {
            debug!(id = %handle.id(), ref_count, "[ConnectionPool] Released connection");
            Ok(ref_count)
        }
        Err(e) => {
            error!(id = %handle.id(), "[ConnectionPool] release() called more often than get()");
            Err(e)
        }
    }
}

/// Keyed, reference-counted connection pool with idle eviction
///
/// Every successful [`get`](Self::get) must be paired with a
/// [`release`](Self::release). A handle that is never released is never
/// reaped. [`acquire`](Self::acquire) returns a guard that releases on drop.
pub struct ConnectionPool<C> {
    shared: Arc<PoolShared<C>>,
    /// Held by `close` until the reaper has been joined
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<C> fmt::Debug for ConnectionPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field(
                "reaper_running",
                &self.reaper.try_lock().map_or(true, |reaper| reaper.is_some()),
            )
            .field("min_reap_interval", &self.shared.min_reap_interval)
            .finish()
    }
}

impl<C> ConnectionPool<C>
where
    C: Send + Sync + 'static,
{
    /// Create a pool and start its reaper
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(factory: Arc<dyn ConnectionFactory<C>>, linger_seconds: i64) -> PoolResult<Self> {
        Self::with_config(factory, PoolConfig::with_linger_seconds(linger_seconds))
    }

    /// Create a pool from a [`PoolConfig`] and start its reaper
    pub fn with_config(
        factory: Arc<dyn ConnectionFactory<C>>,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PoolError::NoRuntime)?;

        let shared = Arc::new(PoolShared {
            factory,
            state: Mutex::new(PoolState {
                table: HashMap::new(),
                linger_seconds: config.linger_seconds,
                closed: false,
            }),
            min_reap_interval: config.min_reap_interval(),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
        });

        let reaper = ReaperLoop::new(Arc::clone(&shared)).spawn(&runtime);

        info!(
            linger_seconds = config.linger_seconds,
            min_reap_interval_ms = config.min_reap_interval_ms,
            "[ConnectionPool] Created"
        );

        Ok(Self {
            shared,
            reaper: Mutex::new(Some(reaper)),
        })
    }

    /// Get a handle for `id`, creating the connection if it is not cached
    ///
    /// Returns `Ok(None)` when the factory could not produce a connection.
    pub async fn get(&self, id: &str) -> PoolResult<Option<Arc<ConnectionHandle<C>>>> {
        self.shared.get(id).await
    }

    /// Like [`get`](Self::get), but the returned guard releases on drop
    pub async fn acquire(&self, id: &str) -> PoolResult<Option<PooledConnection<C>>> {
        let handle = self.shared.get(id).await?;
        Ok(handle.map(|handle| PooledConnection::new(handle, Arc::clone(&self.shared))))
    }

    /// Give back one reference obtained from [`get`](Self::get)
    ///
    /// Returns the remaining ref count. Releasing more often than getting is
    /// a caller bug and fails with [`PoolError::RefCountUnderflow`].
    pub fn release(&self, handle: &ConnectionHandle<C>) -> PoolResult<usize> {
        release_handle(handle)
    }

    /// Mark the connection as broken so it is not reused
    ///
    /// The entry for `handle.id()` is removed regardless of its ref count.
    /// Outstanding borrowers keep their handle until they release it.
    pub async fn report_error(&self, handle: &ConnectionHandle<C>, cause: impl fmt::Display) {
        let cause = cause.to_string();
        self.shared.report_error(handle, &cause).await;
    }

    /// Change the linger time. The reaper picks it up immediately.
    pub async fn set_linger_seconds(&self, linger_seconds: i64) -> PoolResult<()> {
        {
            let mut state = self.shared.state.lock().await;
            if state.closed {
                return Err(PoolError::Closed);
            }
            state.linger_seconds = linger_seconds;
        }
        debug!(linger_seconds, "[ConnectionPool] Linger time updated");
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Current linger time
    pub async fn linger_seconds(&self) -> i64 {
        self.shared.state.lock().await.linger_seconds
    }

    /// Snapshot of the cached handles
    pub async fn list_handles(&self) -> Vec<Arc<ConnectionHandle<C>>> {
        self.shared.state.lock().await.table.values().cloned().collect()
    }

    /// Cached connection ids
    pub async fn keys(&self) -> Vec<String> {
        self.shared.state.lock().await.table.keys().cloned().collect()
    }

    /// Whether a connection for `id` is cached
    pub async fn contains(&self, id: &str) -> bool {
        self.shared.state.lock().await.table.contains_key(id)
    }

    /// Number of cached connections
    pub async fn len(&self) -> usize {
        self.shared.state.lock().await.table.len()
    }

    /// Whether the pool caches no connections
    pub async fn is_empty(&self) -> bool {
        self.shared.state.lock().await.table.is_empty()
    }

    /// Whether `close` has completed
    pub async fn is_closed(&self) -> bool {
        self.shared.state.lock().await.closed
    }

    /// Counts of cached, borrowed and idle handles
    pub async fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock().await;
        let referenced = state.table.values().filter(|h| !h.is_idle()).count();
        PoolStats {
            handles: state.table.len(),
            referenced,
            idle: state.table.len() - referenced,
            linger_seconds: state.linger_seconds,
            closed: state.closed,
        }
    }

    /// Ask the reaper to scan now instead of waiting out its sleep
    pub fn wake_reaper(&self) {
        self.shared.wake.notify_one();
    }

    /// Run one eviction pass inline, returning the number of dropped handles
    pub async fn evict_idle(&self) -> usize {
        self.shared.evict_idle().await
    }

    /// Whether the reaper task is still alive
    pub fn reaper_running(&self) -> bool {
        match self.reaper.try_lock() {
            Ok(reaper) => reaper.as_ref().is_some_and(|handle| !handle.is_finished()),
            // A close is still joining it
            Err(_) => true,
        }
    }

    /// Stop the reaper, drop every cached connection and refuse further use
    ///
    /// Waits for the reaper task to exit. Concurrent callers all wait for the
    /// first one to finish; calling `close` again afterwards is a no-op.
    pub async fn close(&self) {
        self.shared.cancel.cancel();

        let mut reaper = self.reaper.lock().await;
        if let Some(handle) = reaper.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "[ConnectionPool] Reaper task ended abnormally");
            }
        }

        let mut state = self.shared.state.lock().await;
        if state.closed {
            return;
        }
        let dropped = state.table.len();
        state.table.clear();
        state.closed = true;
        info!(dropped, "[ConnectionPool] Closed");
    }
}

impl<C> Drop for ConnectionPool<C> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}
