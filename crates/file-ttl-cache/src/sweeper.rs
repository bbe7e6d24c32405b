//! Timer-driven expiry sweep
//!
//! The sweep runs on its own interval, independent of read/write traffic,
//! so dead rows no one re-requests still get removed from disk. Racing a
//! sweep against fresh writes is safe: only rows whose expiry has already
//! passed are touched.

use crate::cache::TtlCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Handle to a running sweep task; aborts the task on drop
pub struct SweeperHandle {
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) fn spawn(cache: Arc<TtlCache>, every: Duration) -> SweeperHandle {
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately; skip it so a
        // freshly opened store isn't swept before it has done anything.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.clean_expired().await;
            if removed > 0 {
                info!(removed, "Expiry sweep removed dead cache entries");
            }
        }
    });
    SweeperHandle { task }
}
