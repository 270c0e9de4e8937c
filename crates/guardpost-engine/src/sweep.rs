//! Background eviction of idle activity windows.
//!
//! Window entries for actors that stop sending are never touched by the
//! hot path again; this cooperative task bounds that memory. It runs off
//! the event path entirely.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use crate::rate_limit::RateLimiter;
use crate::types::epoch_ms_now;

/// Configuration for the window sweeper.
#[derive(Clone, Debug)]
pub struct SweepConfig {
    /// How often to scan for idle windows.
    pub interval: Duration,
    /// Whether the sweeper runs at all.
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            enabled: true,
        }
    }
}

/// Spawns the periodic sweep task and returns its join handle.
///
/// With `enabled = false` the task exits immediately; callers can still
/// hold the handle uniformly.
pub fn spawn_sweeper(limiter: Arc<RateLimiter>, config: SweepConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            return;
        }
        let mut ticker = time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a fresh process
        // does not sweep an empty store.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = limiter.sweep_idle(epoch_ms_now());
            if evicted > 0 {
                debug!(evicted, "idle activity windows evicted");
            }
        }
    })
}
