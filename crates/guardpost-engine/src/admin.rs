//! Settings and allowlist administration.
//!
//! These are the mutating operations behind the platform's configuration
//! commands. Every write persists to the store first and then updates the
//! config cache in place, so cache and store never diverge for longer
//! than the write itself. Rendering of responses stays with the platform
//! glue.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::cache::ConfigCache;
use crate::command::CommandScope;
use crate::config::TenantRateConfig;
use crate::error::Result;
use crate::store::{PermissionGrant, PermissionStore, TenantConfigStore};
use crate::types::{GuildId, UserId};

/// Administrative operations over tenant settings and grants.
pub struct AdminService {
    settings: Arc<dyn TenantConfigStore>,
    grants: Arc<dyn PermissionStore>,
    cache: Arc<ConfigCache>,
}

impl AdminService {
    /// Creates the service over the given stores and cache.
    pub fn new(
        settings: Arc<dyn TenantConfigStore>,
        grants: Arc<dyn PermissionStore>,
        cache: Arc<ConfigCache>,
    ) -> Self {
        Self {
            settings,
            grants,
            cache,
        }
    }

    /// Ensures a default settings row and cache entry exist for a guild.
    ///
    /// Called on first contact with a tenant (join event). The cache
    /// insert is best-effort: a settings write that raced ahead keeps its
    /// entry.
    pub async fn ensure_tenant(&self, guild: GuildId) -> Result<()> {
        if self.cache.peek(guild).is_some() {
            return Ok(());
        }
        self.settings.ensure_default(guild).await?;
        self.cache.put_if_absent(guild, TenantRateConfig::default());
        Ok(())
    }

    /// Grants an actor a command scope. Idempotent.
    pub async fn grant(
        &self,
        guild: GuildId,
        user: UserId,
        scope: CommandScope,
        granted_by: UserId,
    ) -> Result<()> {
        self.grants
            .grant(PermissionGrant {
                guild_id: guild,
                user_id: user,
                scope,
                granted_by,
                granted_at: Utc::now(),
            })
            .await?;
        info!(%guild, %user, scope = %scope, %granted_by, "allowlist grant added");
        Ok(())
    }

    /// Revokes the exact grant triple. Wildcard and concrete grants are
    /// independent rows; revoking one never touches the other.
    pub async fn revoke(&self, guild: GuildId, user: UserId, scope: CommandScope) -> Result<()> {
        self.grants.revoke(guild, user, scope).await?;
        info!(%guild, %user, scope = %scope, "allowlist grant removed");
        Ok(())
    }

    /// Lists grants for a guild; a concrete filter also returns wildcard
    /// rows, since those cover the filtered command.
    pub async fn list_grants(
        &self,
        guild: GuildId,
        filter: CommandScope,
    ) -> Result<Vec<PermissionGrant>> {
        self.grants.list(guild, filter).await
    }

    /// Enables or disables the limiter, preserving the stored thresholds.
    pub async fn set_enabled(&self, guild: GuildId, enabled: bool) -> Result<TenantRateConfig> {
        let mut config = match self.cache.peek(guild) {
            Some(config) => config,
            None => {
                self.settings.ensure_default(guild).await?;
                TenantRateConfig::default()
            }
        };
        config.enabled = enabled;
        self.settings.upsert(guild, config.clone()).await?;
        self.cache.put(guild, config.clone());
        info!(%guild, enabled, "anti-spam toggled");
        Ok(config)
    }

    /// Sets the limiter thresholds, validating bounds before any
    /// persistence. Persisting new thresholds also enables the limiter.
    pub async fn configure(
        &self,
        guild: GuildId,
        max_messages: u32,
        window_secs: u32,
        timeout_secs: u32,
    ) -> Result<TenantRateConfig> {
        let config = TenantRateConfig {
            enabled: true,
            max_messages,
            window_secs,
            timeout_secs,
        };
        config.validate()?;
        self.settings.upsert(guild, config.clone()).await?;
        self.cache.put(guild, config.clone());
        info!(%guild, max_messages, window_secs, timeout_secs, "anti-spam thresholds updated");
        Ok(config)
    }
}
