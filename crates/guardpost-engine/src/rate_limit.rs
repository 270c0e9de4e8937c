//! Sliding-window rate limiting with automatic mitigation.
//!
//! Every inbound activity event is recorded against the actor's window;
//! exceeding the tenant's capacity fires a time-boxed mitigation through
//! the platform client and clears the window, so the next event starts a
//! fresh count rather than a gradually draining one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::cache::ConfigCache;
use crate::mitigation::MitigationTrigger;
use crate::types::{GuildId, UserId};
use crate::window::{ActivityWindowStore, WindowUpdate};

/// Result of observing one activity event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateDecision {
    /// No threshold crossed; nothing to do.
    NoAction,
    /// The actor exceeded the window capacity and a mitigation was fired.
    Mitigated {
        /// Duration of the applied restriction in seconds.
        timeout_secs: u32,
    },
}

/// Counters describing limiter activity since startup.
#[derive(Clone, Debug, Default)]
pub struct RateLimiterStats {
    /// Events recorded for enabled tenants.
    pub observed: u64,
    /// Events ignored because the tenant has the limiter disabled.
    pub skipped_disabled: u64,
    /// Mitigations fired.
    pub mitigations: u64,
    /// Mitigations whose platform apply failed.
    pub failed_applies: u64,
    /// Actors currently holding window state.
    pub active_windows: usize,
}

/// Per-actor sliding-window rate limiter.
pub struct RateLimiter {
    cache: Arc<ConfigCache>,
    windows: ActivityWindowStore,
    trigger: MitigationTrigger,
    observed: AtomicU64,
    skipped_disabled: AtomicU64,
    mitigations: AtomicU64,
    failed_applies: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter over the given config cache and trigger.
    pub fn new(cache: Arc<ConfigCache>, trigger: MitigationTrigger) -> Self {
        Self {
            cache,
            windows: ActivityWindowStore::new(),
            trigger,
            observed: AtomicU64::new(0),
            skipped_disabled: AtomicU64::new(0),
            mitigations: AtomicU64::new(0),
            failed_applies: AtomicU64::new(0),
        }
    }

    /// Records an activity event and decides whether to mitigate.
    ///
    /// Disabled tenants accumulate no window state. When the window
    /// exceeds capacity the mitigation is applied through the platform
    /// client; a failed apply is logged and the decision still stands,
    /// the window reset having already happened.
    pub async fn observe(&self, guild: GuildId, user: UserId, now_ms: u64) -> RateDecision {
        let config = self.cache.get_or_ensure(guild).await;
        if !config.enabled {
            self.skipped_disabled.fetch_add(1, Ordering::Relaxed);
            return RateDecision::NoAction;
        }
        self.observed.fetch_add(1, Ordering::Relaxed);

        match self
            .windows
            .record(guild, user, now_ms, config.window_ms(), config.max_messages)
        {
            WindowUpdate::Within { .. } => RateDecision::NoAction,
            WindowUpdate::Exceeded => {
                self.mitigations.fetch_add(1, Ordering::Relaxed);
                let reason = format!(
                    "auto anti-spam: >{} events/{}s",
                    config.max_messages, config.window_secs
                );
                if let Err(err) = self
                    .trigger
                    .apply(guild, user, config.timeout_secs, &reason)
                    .await
                {
                    self.failed_applies.fetch_add(1, Ordering::Relaxed);
                    warn!(%guild, %user, error = %err, "mitigation apply failed");
                }
                RateDecision::Mitigated {
                    timeout_secs: config.timeout_secs,
                }
            }
        }
    }

    /// Evicts idle window entries; called by the background sweeper.
    ///
    /// Each entry's staleness is judged against its own tenant's window
    /// duration, falling back to the default for tenants the cache has
    /// not seen.
    pub fn sweep_idle(&self, now_ms: u64) -> usize {
        self.windows.sweep_stale(now_ms, |guild| {
            self.cache
                .peek(guild)
                .unwrap_or_default()
                .window_ms()
        })
    }

    /// Window length for an actor, if any state exists. Test hook.
    pub fn window_len(&self, guild: GuildId, user: UserId) -> Option<usize> {
        self.windows.len_of(guild, user)
    }

    /// Snapshot of limiter counters.
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            observed: self.observed.load(Ordering::Relaxed),
            skipped_disabled: self.skipped_disabled.load(Ordering::Relaxed),
            mitigations: self.mitigations.load(Ordering::Relaxed),
            failed_applies: self.failed_applies.load(Ordering::Relaxed),
            active_windows: self.windows.active_keys(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TenantRateConfig;
    use crate::mitigation::{FailingMitigationClient, RecordingMitigationClient};
    use crate::store::{MemoryTenantConfigStore, TenantConfigStore};

    async fn limiter_with(
        config: TenantRateConfig,
    ) -> (Arc<RateLimiter>, Arc<RecordingMitigationClient>, GuildId) {
        let guild = GuildId::new(1);
        let store = Arc::new(MemoryTenantConfigStore::new());
        store.upsert(guild, config).await.unwrap();
        let cache = Arc::new(ConfigCache::new(store));
        cache.warm_from_store().await.unwrap();
        let client = Arc::new(RecordingMitigationClient::new());
        let limiter = Arc::new(RateLimiter::new(
            cache,
            MitigationTrigger::new(client.clone()),
        ));
        (limiter, client, guild)
    }

    fn enabled_config(max_messages: u32, window_secs: u32, timeout_secs: u32) -> TenantRateConfig {
        TenantRateConfig {
            enabled: true,
            max_messages,
            window_secs,
            timeout_secs,
        }
    }

    #[tokio::test]
    async fn test_disabled_tenant_no_action_no_state() {
        let (limiter, client, guild) = limiter_with(TenantRateConfig::default()).await;
        let user = UserId::new(2);
        for t in 0..100u64 {
            assert_eq!(limiter.observe(guild, user, t).await, RateDecision::NoAction);
        }
        assert_eq!(limiter.window_len(guild, user), None);
        assert!(client.applied().is_empty());
        assert_eq!(limiter.stats().skipped_disabled, 100);
        assert_eq!(limiter.stats().observed, 0);
    }

    #[tokio::test]
    async fn test_fires_on_capacity_exceeded_and_resets() {
        // enabled, 3 msgs / 5s window, 20s timeout
        let (limiter, client, guild) = limiter_with(enabled_config(3, 5, 20)).await;
        let user = UserId::new(2);

        // Events at t=0,1,2 seconds: window lengths 1,2,3, no action.
        for t in [0u64, 1000, 2000] {
            assert_eq!(limiter.observe(guild, user, t).await, RateDecision::NoAction);
        }
        // 4th event at t=3s exceeds the capacity of 3.
        assert_eq!(
            limiter.observe(guild, user, 3000).await,
            RateDecision::Mitigated { timeout_secs: 20 }
        );
        assert_eq!(limiter.window_len(guild, user), Some(0));
        assert_eq!(client.applied().len(), 1);

        // Event at t=3.5s starts a fresh count of 1.
        assert_eq!(
            limiter.observe(guild, user, 3500).await,
            RateDecision::NoAction
        );
        assert_eq!(limiter.window_len(guild, user), Some(1));
    }

    #[tokio::test]
    async fn test_fires_once_per_threshold_crossing() {
        let (limiter, client, guild) = limiter_with(enabled_config(2, 10, 30)).await;
        let user = UserId::new(2);

        let mut mitigated = 0;
        for t in 0..9u64 {
            if let RateDecision::Mitigated { .. } = limiter.observe(guild, user, t * 100).await {
                mitigated += 1;
            }
        }
        // 9 rapid events with capacity 2: fires on the 3rd, 6th, 9th.
        assert_eq!(mitigated, 3);
        assert_eq!(client.applied().len(), 3);
    }

    #[tokio::test]
    async fn test_spread_out_events_never_fire() {
        let (limiter, client, guild) = limiter_with(enabled_config(3, 2, 20)).await;
        let user = UserId::new(2);
        for i in 0..20u64 {
            // One event per window length: always prunes back to 1.
            assert_eq!(
                limiter.observe(guild, user, i * 2001).await,
                RateDecision::NoAction
            );
        }
        assert!(client.applied().is_empty());
    }

    #[tokio::test]
    async fn test_failed_apply_is_non_fatal_and_reset_stands() {
        let guild = GuildId::new(1);
        let store = Arc::new(MemoryTenantConfigStore::new());
        store.upsert(guild, enabled_config(2, 5, 30)).await.unwrap();
        let cache = Arc::new(ConfigCache::new(store));
        cache.warm_from_store().await.unwrap();
        let limiter = RateLimiter::new(cache, MitigationTrigger::new(Arc::new(FailingMitigationClient)));

        let user = UserId::new(2);
        for t in [0u64, 100] {
            limiter.observe(guild, user, t).await;
        }
        // The decision is still Mitigated and the window still resets.
        assert_eq!(
            limiter.observe(guild, user, 200).await,
            RateDecision::Mitigated { timeout_secs: 30 }
        );
        assert_eq!(limiter.window_len(guild, user), Some(0));
        assert_eq!(limiter.stats().failed_applies, 1);
    }

    #[tokio::test]
    async fn test_actors_rate_limited_independently() {
        let (limiter, _client, guild) = limiter_with(enabled_config(2, 5, 30)).await;
        let spammer = UserId::new(2);
        let bystander = UserId::new(3);
        for t in [0u64, 100] {
            limiter.observe(guild, spammer, t).await;
        }
        assert_eq!(
            limiter.observe(guild, spammer, 200).await,
            RateDecision::Mitigated { timeout_secs: 30 }
        );
        assert_eq!(
            limiter.observe(guild, bystander, 200).await,
            RateDecision::NoAction
        );
    }

    #[tokio::test]
    async fn test_first_contact_tenant_gets_default_disabled() {
        let store = Arc::new(MemoryTenantConfigStore::new());
        let cache = Arc::new(ConfigCache::new(store.clone()));
        let client = Arc::new(RecordingMitigationClient::new());
        let limiter = RateLimiter::new(cache, MitigationTrigger::new(client));

        let guild = GuildId::new(42);
        assert_eq!(
            limiter.observe(guild, UserId::new(1), 0).await,
            RateDecision::NoAction
        );
        // The default row was created in the store on first contact.
        assert_eq!(store.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_idle_uses_tenant_window() {
        let (limiter, _client, guild) = limiter_with(enabled_config(6, 4, 30)).await;
        limiter.observe(guild, UserId::new(1), 0).await;
        limiter.observe(guild, UserId::new(2), 9000).await;

        let evicted = limiter.sweep_idle(10_000);
        assert_eq!(evicted, 1);
        assert_eq!(limiter.window_len(guild, UserId::new(1)), None);
        assert_eq!(limiter.window_len(guild, UserId::new(2)), Some(1));
    }

    #[tokio::test]
    async fn test_stats_counters() {
        let (limiter, _client, guild) = limiter_with(enabled_config(2, 5, 30)).await;
        let user = UserId::new(2);
        for t in [0u64, 100, 200] {
            limiter.observe(guild, user, t).await;
        }
        let stats = limiter.stats();
        assert_eq!(stats.observed, 3);
        assert_eq!(stats.mitigations, 1);
        assert_eq!(stats.failed_applies, 0);
    }
}
