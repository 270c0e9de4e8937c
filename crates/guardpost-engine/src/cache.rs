//! Tenant configuration cache.
//!
//! The rate limiter consults this cache on every inbound event; the
//! persistent store is only touched on startup warm, first contact with a
//! tenant, and explicit settings writes. There is no asynchronous
//! invalidation: writers persist first, then update the cache in place.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::TenantRateConfig;
use crate::error::Result;
use crate::store::TenantConfigStore;
use crate::types::GuildId;

/// In-memory, guild-indexed cache of rate limiter settings.
pub struct ConfigCache {
    store: Arc<dyn TenantConfigStore>,
    entries: DashMap<GuildId, TenantRateConfig>,
}

impl ConfigCache {
    /// Creates an empty cache over the given store.
    pub fn new(store: Arc<dyn TenantConfigStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    /// Loads every stored tenant row into the cache.
    ///
    /// Called once at startup. Returns the number of tenants loaded.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the store cannot be read; the caller
    /// treats a warm failure as fatal.
    pub async fn warm_from_store(&self) -> Result<usize> {
        let rows = self.store.read_all().await?;
        let count = rows.len();
        for (guild, config) in rows {
            self.entries.insert(guild, config);
        }
        debug!(tenants = count, "config cache warmed");
        Ok(count)
    }

    /// Returns the settings for a guild, ensuring a default row exists
    /// for first-contact tenants.
    ///
    /// On a cache miss the default row is created in the store before the
    /// default is cached; the store's uniqueness constraint arbitrates
    /// concurrent callers, and the cache insert keeps whatever a racing
    /// settings write may already have put there. If the store is
    /// unreachable the default-disabled settings are returned without
    /// caching them, so a recovered store repopulates on the next event.
    pub async fn get_or_ensure(&self, guild: GuildId) -> TenantRateConfig {
        if let Some(entry) = self.entries.get(&guild) {
            return entry.clone();
        }
        match self.store.ensure_default(guild).await {
            Ok(()) => self
                .entries
                .entry(guild)
                .or_default()
                .clone(),
            Err(err) => {
                warn!(%guild, error = %err, "settings store unavailable, using defaults");
                TenantRateConfig::default()
            }
        }
    }

    /// Replaces the cached settings after a durable write.
    pub fn put(&self, guild: GuildId, config: TenantRateConfig) {
        self.entries.insert(guild, config);
    }

    /// Caches the default for a guild unless an entry already exists.
    pub fn put_if_absent(&self, guild: GuildId, config: TenantRateConfig) {
        self.entries.entry(guild).or_insert(config);
    }

    /// Returns the cached settings without touching the store.
    pub fn peek(&self, guild: GuildId) -> Option<TenantRateConfig> {
        self.entries.get(&guild).map(|entry| entry.clone())
    }

    /// Number of cached tenants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if no tenants are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
