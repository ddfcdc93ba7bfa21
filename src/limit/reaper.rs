//! Periodic eviction of stale limiter state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::registry::Limiters;

/// Default sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Background task that sweeps every registered limiter on a fixed
/// cadence, bounding memory for keys that stop sending traffic.
///
/// Advisory cleanup only: the limiters evict lazily on their own decision
/// path, so a delayed or missed sweep never affects correctness.
pub struct Reaper {
    limiters: Arc<Limiters>,
    interval: Duration,
}

impl Reaper {
    pub fn new(limiters: Arc<Limiters>, interval: Duration) -> Self {
        Self { limiters, interval }
    }

    /// Spawn the sweep loop. It runs until `shutdown` observes a change.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval_secs = self.interval.as_secs(), "Reaper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => self.sweep_all(),
                    _ = shutdown.changed() => {
                        info!("Reaper stopped");
                        break;
                    }
                }
            }
        })
    }

    fn sweep_all(&self) {
        let now = Utc::now();
        for (name, limiter) in self.limiters.iter() {
            let (windows, blocks) = limiter.sweep(now);
            if windows > 0 || blocks > 0 {
                debug!(
                    limiter = %name,
                    windows_removed = windows,
                    blocks_removed = blocks,
                    "Swept expired limiter state"
                );
            }
        }
    }
}
