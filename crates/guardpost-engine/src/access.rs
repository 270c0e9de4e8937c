//! Privileged-operation access resolution.
//!
//! Decision order, cheapest and most trusted first: tenant owner, then
//! elevated role capabilities, then the persisted allowlist (exact
//! command or wildcard). The resolver never fetches membership data
//! itself; callers supply it from the platform, which keeps the decision
//! logic independent of the platform client.

use std::sync::Arc;

use crate::command::RestrictedCommand;
use crate::error::Result;
use crate::store::PermissionStore;
use crate::types::{GuildId, RoleFlags, UserId};

/// Membership facts about the invoking actor, supplied by the caller.
#[derive(Clone, Debug)]
pub struct MemberContext {
    /// The guild's designated owner.
    pub owner_id: UserId,
    /// Role capabilities the actor holds.
    pub roles: RoleFlags,
}

impl MemberContext {
    /// Creates a new member context.
    pub fn new(owner_id: UserId, roles: RoleFlags) -> Self {
        Self { owner_id, roles }
    }
}

/// Decides whether an actor may invoke a restricted command.
pub struct AccessResolver {
    grants: Arc<dyn PermissionStore>,
}

impl AccessResolver {
    /// Creates a resolver over the given grant store.
    pub fn new(grants: Arc<dyn PermissionStore>) -> Self {
        Self { grants }
    }

    /// Checks whether the actor may invoke the command in the guild.
    ///
    /// Read-only; grants are only consulted when neither the owner check
    /// nor the role shortcuts allow.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the grant store cannot be reached.
    /// Callers must treat that as deny, never default-allow.
    pub async fn authorize(
        &self,
        guild: GuildId,
        user: UserId,
        member: &MemberContext,
        command: RestrictedCommand,
    ) -> Result<bool> {
        if user == member.owner_id {
            return Ok(true);
        }
        if member.roles.is_elevated() {
            return Ok(true);
        }
        self.grants.exists(guild, user, command).await
    }
}
