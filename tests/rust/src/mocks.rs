//! Mock connection factories for testing
//!
//! In-memory factories that record how often they were asked for a
//! connection, for fast, isolated pool tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use lingerpool_core::ConnectionFactory;
use parking_lot::Mutex;

/// Connection value produced by the mocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConnection {
    pub id: String,
    /// Unique across everything a factory has created
    pub serial: usize,
}

// ============================================================================
// CountingFactory
// ============================================================================

/// Always succeeds, optionally after a delay, and counts creations per id
#[derive(Default)]
pub struct CountingFactory {
    created: AtomicUsize,
    per_id: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl CountingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every creation to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total connections created
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Connections created for `id`
    pub fn created_for(&self, id: &str) -> usize {
        self.per_id.lock().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ConnectionFactory<MockConnection> for CountingFactory {
    async fn create_connection(&self, id: &str) -> Result<Option<MockConnection>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let serial = self.created.fetch_add(1, Ordering::SeqCst);
        *self.per_id.lock().entry(id.to_string()).or_insert(0) += 1;

        Ok(Some(MockConnection {
            id: id.to_string(),
            serial,
        }))
    }
}

// ============================================================================
// AbsentFactory
// ============================================================================

/// Never has a connection available
#[derive(Default)]
pub struct AbsentFactory {
    calls: AtomicUsize,
}

impl AbsentFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory<MockConnection> for AbsentFactory {
    async fn create_connection(&self, _id: &str) -> Result<Option<MockConnection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

// ============================================================================
// FailingFactory
// ============================================================================

/// Fails the first `failures` creations, then behaves like [`CountingFactory`]
pub struct FailingFactory {
    remaining_failures: AtomicUsize,
    calls: AtomicUsize,
    inner: CountingFactory,
}

impl FailingFactory {
    pub fn new(failures: usize) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
            inner: CountingFactory::new(),
        }
    }

    /// Fails forever
    pub fn always() -> Self {
        Self::new(usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.inner.created()
    }
}

#[async_trait]
impl ConnectionFactory<MockConnection> for FailingFactory {
    async fn create_connection(&self, id: &str) -> Result<Option<MockConnection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(anyhow!("remote unreachable: {}", id));
        }

        self.inner.create_connection(id).await
    }
}
