//! Connection handle
//!
//! A handle wraps one connection value created by a
//! [`ConnectionFactory`](crate::ConnectionFactory) and tracks how many callers
//! currently borrow it and when the latest borrow began.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{PoolError, PoolResult};

#[derive(Debug)]
struct HandleState {
    ref_count: usize,
    last_used: Instant,
}

/// A reference-counted, cache-resident wrapper around one connection
pub struct ConnectionHandle<C> {
    id: String,
    connection: C,
    created_at: DateTime<Utc>,
    state: Mutex<HandleState>,
}

impl<C> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("ref_count", &state.ref_count)
            .field("idle_for", &state.last_used.elapsed())
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl<C> ConnectionHandle<C> {
    /// Wrap a freshly created connection. The handle starts unreferenced.
    pub(crate) fn new(id: String, connection: C) -> Self {
        Self {
            id,
            connection,
            created_at: Utc::now(),
            state: Mutex::new(HandleState {
                ref_count: 0,
                last_used: Instant::now(),
            }),
        }
    }

    /// Identifier the connection was created for
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The pooled connection, shared by every borrower of this handle
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Wall-clock time the connection was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of outstanding borrows
    pub fn ref_count(&self) -> usize {
        self.state.lock().ref_count
    }

    /// When the most recent borrow began
    pub fn last_used(&self) -> Instant {
        self.state.lock().last_used
    }

    /// Time since the most recent borrow began
    pub fn idle_duration(&self) -> Duration {
        self.state.lock().last_used.elapsed()
    }

    /// Whether nobody currently borrows the connection
    pub fn is_idle(&self) -> bool {
        self.state.lock().ref_count == 0
    }

    /// Start a borrow. Restarts the idle clock on the 0 -> 1 transition.
    pub(crate) fn retain(&self) -> usize {
        let mut state = self.state.lock();
        if state.ref_count == 0 {
            state.last_used = Instant::now();
        }
        state.ref_count += 1;
        state.ref_count
    }

    /// End a borrow
    pub(crate) fn unref(&self) -> PoolResult<usize> {
        let mut state = self.state.lock();
        if state.ref_count == 0 {
            return Err(PoolError::RefCountUnderflow {
                id: self.id.clone(),
            });
        }
        state.ref_count -= 1;
        Ok(state.ref_count)
    }

    /// Whether the reaper may drop this handle at `now`
    pub(crate) fn is_evictable(&self, linger_seconds: i64, now: Instant) -> bool {
        let state = self.state.lock();
        if state.ref_count > 0 {
            return false;
        }
        linger_exceeded(now.saturating_duration_since(state.last_used), linger_seconds)
    }
}

/// A non-positive linger makes every unreferenced handle eligible
fn linger_exceeded(idle: Duration, linger_seconds: i64) -> bool {
    match u64::try_from(linger_seconds) {
        Ok(0) | Err(_) => true,
        Ok(secs) => idle > Duration::from_secs(secs),
    }
}
