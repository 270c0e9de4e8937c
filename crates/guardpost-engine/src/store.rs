//! Durable store interfaces for tenant settings and allowlist grants.
//!
//! The traits abstract over the storage backend so the engine runs
//! against the in-memory stores in tests and single-process deployments,
//! and a SQL-backed implementation in production. Both stores enforce
//! uniqueness at the row level; concurrent create-if-absent callers are
//! arbitrated there, not in the cache.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::command::{CommandScope, RestrictedCommand};
use crate::config::TenantRateConfig;
use crate::error::{EngineError, Result};
use crate::types::{GuildId, UserId};

/// A persisted allowlist grant.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PermissionGrant {
    /// Guild the grant applies to.
    pub guild_id: GuildId,
    /// Actor receiving the grant.
    pub user_id: UserId,
    /// Command scope covered by the grant.
    pub scope: CommandScope,
    /// Actor who created the grant.
    pub granted_by: UserId,
    /// When the grant was created.
    pub granted_at: DateTime<Utc>,
}

/// Durable store of per-tenant rate limiter settings.
///
/// Implementations must enforce uniqueness on the guild ID.
#[async_trait]
pub trait TenantConfigStore: Send + Sync {
    /// Reads every stored tenant row.
    async fn read_all(&self) -> Result<Vec<(GuildId, TenantRateConfig)>>;

    /// Inserts the default settings row if the guild has none.
    ///
    /// Idempotent under concurrent callers; the uniqueness constraint is
    /// the race arbiter, so the first writer wins and later callers
    /// observe its row.
    async fn ensure_default(&self, guild: GuildId) -> Result<()>;

    /// Inserts or replaces the settings row for a guild.
    async fn upsert(&self, guild: GuildId, config: TenantRateConfig) -> Result<()>;
}

/// Durable store of allowlist grants.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Checks whether a grant covers the command: an exact row for the
    /// command or a wildcard row for the same actor.
    async fn exists(
        &self,
        guild: GuildId,
        user: UserId,
        command: RestrictedCommand,
    ) -> Result<bool>;

    /// Inserts a grant unless the exact (guild, user, scope) triple
    /// already exists. Granting twice is idempotent, not an error.
    async fn grant(&self, grant: PermissionGrant) -> Result<()>;

    /// Deletes the grant matching the exact triple, if present. Revoking
    /// the wildcard never touches concrete rows and vice versa.
    async fn revoke(&self, guild: GuildId, user: UserId, scope: CommandScope) -> Result<()>;

    /// Lists grants for a guild, ordered by user ID.
    ///
    /// A wildcard filter returns every row; a concrete command returns
    /// rows for that command plus wildcard rows.
    async fn list(&self, guild: GuildId, filter: CommandScope) -> Result<Vec<PermissionGrant>>;
}

/// In-memory tenant settings store backed by a BTreeMap. Thread-safe via
/// RwLock.
///
/// Used by tests and single-process deployments; production swaps in a
/// SQL-backed implementation behind the same trait.
pub struct MemoryTenantConfigStore {
    rows: RwLock<BTreeMap<GuildId, TenantRateConfig>>,
}

impl MemoryTenantConfigStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryTenantConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TenantConfigStore for MemoryTenantConfigStore {
    async fn read_all(&self) -> Result<Vec<(GuildId, TenantRateConfig)>> {
        let rows = self
            .rows
            .read()
            .map_err(|e| EngineError::store_unavailable(format!("lock poisoned: {}", e)))?;
        Ok(rows.iter().map(|(g, c)| (*g, c.clone())).collect())
    }

    async fn ensure_default(&self, guild: GuildId) -> Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| EngineError::store_unavailable(format!("lock poisoned: {}", e)))?;
        rows.entry(guild).or_default();
        Ok(())
    }

    async fn upsert(&self, guild: GuildId, config: TenantRateConfig) -> Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| EngineError::store_unavailable(format!("lock poisoned: {}", e)))?;
        rows.insert(guild, config);
        Ok(())
    }
}

/// In-memory grant store keyed by the unique (guild, user, scope) triple.
/// Thread-safe via RwLock.
pub struct MemoryPermissionStore {
    rows: RwLock<BTreeMap<(GuildId, UserId, CommandScope), PermissionGrant>>,
}

impl MemoryPermissionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl Default for MemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn exists(
        &self,
        guild: GuildId,
        user: UserId,
        command: RestrictedCommand,
    ) -> Result<bool> {
        let rows = self
            .rows
            .read()
            .map_err(|e| EngineError::store_unavailable(format!("lock poisoned: {}", e)))?;
        Ok(rows.contains_key(&(guild, user, CommandScope::Command(command)))
            || rows.contains_key(&(guild, user, CommandScope::All)))
    }

    async fn grant(&self, grant: PermissionGrant) -> Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| EngineError::store_unavailable(format!("lock poisoned: {}", e)))?;
        // First writer wins; a duplicate grant keeps the original row.
        rows.entry((grant.guild_id, grant.user_id, grant.scope))
            .or_insert(grant);
        Ok(())
    }

    async fn revoke(&self, guild: GuildId, user: UserId, scope: CommandScope) -> Result<()> {
        let mut rows = self
            .rows
            .write()
            .map_err(|e| EngineError::store_unavailable(format!("lock poisoned: {}", e)))?;
        rows.remove(&(guild, user, scope));
        Ok(())
    }

    async fn list(&self, guild: GuildId, filter: CommandScope) -> Result<Vec<PermissionGrant>> {
        let rows = self
            .rows
            .read()
            .map_err(|e| EngineError::store_unavailable(format!("lock poisoned: {}", e)))?;
        let mut out: Vec<PermissionGrant> = rows
            .values()
            .filter(|g| g.guild_id == guild)
            .filter(|g| match filter {
                CommandScope::All => true,
                CommandScope::Command(_) => g.scope == filter || g.scope == CommandScope::All,
            })
            .cloned()
            .collect();
        out.sort_by_key(|g| (g.user_id, g.scope));
        Ok(out)
    }
}
