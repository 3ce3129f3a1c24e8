//! Reaper - background eviction of idle connections
//!
//! One task per pool. Each cycle it sleeps for the pool's current linger time
//! (never less than the configured floor), then runs one eviction pass.
//! The sleep ends early on a forced rescan and the task exits as soon as the
//! pool's cancellation token fires.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::pool::PoolShared;

pub(crate) struct ReaperLoop<C> {
    shared: Arc<PoolShared<C>>,
}

impl<C> ReaperLoop<C>
where
    C: Send + Sync + 'static,
{
    pub(crate) fn new(shared: Arc<PoolShared<C>>) -> Self {
        Self { shared }
    }

    pub(crate) fn spawn(self, runtime: &tokio::runtime::Handle) -> JoinHandle<()> {
        runtime.spawn(self.run())
    }

    async fn run(self) {
        let shared = self.shared;
        debug!("[Reaper] Started");

        loop {
            let Some(interval) = shared.reap_interval().await else {
                break;
            };

            tokio::select! {
                biased;
                () = shared.cancel.cancelled() => break,
                () = shared.wake.notified() => {
                    debug!("[Reaper] Woken early, forcing connection scan");
                }
                () = tokio::time::sleep(interval) => {}
            }

            let evicted = shared.evict_idle().await;
            trace!(evicted, "[Reaper] Scan complete");
        }

        debug!("[Reaper] Stopped");
    }
}
