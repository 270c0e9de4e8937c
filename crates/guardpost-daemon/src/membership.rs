//! Membership lookups supplied by the platform.
//!
//! The engine never fetches owner or role facts itself; the platform
//! glue resolves them through this seam before (roles) or during (owner)
//! command handling.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use guardpost_engine::error::{EngineError, Result};
use guardpost_engine::types::{GuildId, RoleFlags, UserId};

/// Resolves guild-owner and actor-role facts from the platform's
/// membership data.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// The designated owner of the guild.
    async fn owner_of(&self, guild: GuildId) -> Result<UserId>;

    /// Role capabilities the actor holds in the guild.
    async fn roles_of(&self, guild: GuildId, user: UserId) -> Result<RoleFlags>;
}

/// Fixed membership table for tests and local runs.
pub struct StaticMembership {
    owners: RwLock<HashMap<GuildId, UserId>>,
    roles: RwLock<HashMap<(GuildId, UserId), RoleFlags>>,
}

impl StaticMembership {
    /// Creates an empty membership table.
    pub fn new() -> Self {
        Self {
            owners: RwLock::new(HashMap::new()),
            roles: RwLock::new(HashMap::new()),
        }
    }

    /// Records the owner of a guild.
    pub fn set_owner(&self, guild: GuildId, owner: UserId) {
        self.owners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(guild, owner);
    }

    /// Records an actor's role flags in a guild.
    pub fn set_roles(&self, guild: GuildId, user: UserId, flags: RoleFlags) {
        self.roles
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert((guild, user), flags);
    }
}

impl Default for StaticMembership {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipProvider for StaticMembership {
    async fn owner_of(&self, guild: GuildId) -> Result<UserId> {
        self.owners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&guild)
            .copied()
            .ok_or_else(|| EngineError::store_unavailable(format!("unknown guild {}", guild)))
    }

    async fn roles_of(&self, guild: GuildId, user: UserId) -> Result<RoleFlags> {
        Ok(self
            .roles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(guild, user))
            .copied()
            .unwrap_or(RoleFlags::NONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_owner_lookup() {
        let membership = StaticMembership::new();
        membership.set_owner(GuildId::new(1), UserId::new(100));
        assert_eq!(
            membership.owner_of(GuildId::new(1)).await.unwrap(),
            UserId::new(100)
        );
        assert!(membership.owner_of(GuildId::new(2)).await.is_err());
    }

    #[tokio::test]
    async fn test_roles_default_to_none() {
        let membership = StaticMembership::new();
        membership.set_roles(GuildId::new(1), UserId::new(2), RoleFlags::ADMINISTRATOR);
        assert!(membership
            .roles_of(GuildId::new(1), UserId::new(2))
            .await
            .unwrap()
            .has_administrator());
        assert_eq!(
            membership.roles_of(GuildId::new(1), UserId::new(3)).await.unwrap(),
            RoleFlags::NONE
        );
    }
}
