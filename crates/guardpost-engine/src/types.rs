//! Core identifier types shared across the guardpost engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tenant guild.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GuildId(u64);

impl GuildId {
    /// Creates a new GuildId from a raw u64 value.
    pub fn new(id: u64) -> Self {
        GuildId(id)
    }

    /// Returns the raw u64 value of this guild ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an actor within a guild.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(u64);

impl UserId {
    /// Creates a new UserId from a raw u64 value.
    pub fn new(id: u64) -> Self {
        UserId(id)
    }

    /// Returns the raw u64 value of this user ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role capabilities relevant to access decisions (platform bit flags).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags(pub u32);

impl RoleFlags {
    /// No elevated capabilities.
    pub const NONE: RoleFlags = RoleFlags(0);
    /// Administrative capability over the guild.
    pub const ADMINISTRATOR: RoleFlags = RoleFlags(1 << 3);
    /// Guild-management capability.
    pub const MANAGE_GUILD: RoleFlags = RoleFlags(1 << 5);

    /// Checks if the flags include the administrator capability.
    pub fn has_administrator(&self) -> bool {
        self.0 & Self::ADMINISTRATOR.0 != 0
    }

    /// Checks if the flags include the guild-management capability.
    pub fn has_manage_guild(&self) -> bool {
        self.0 & Self::MANAGE_GUILD.0 != 0
    }

    /// Checks if either elevated capability is present.
    pub fn is_elevated(&self) -> bool {
        self.has_administrator() || self.has_manage_guild()
    }

    /// Returns the union of two flag sets.
    pub fn union(self, other: RoleFlags) -> RoleFlags {
        RoleFlags(self.0 | other.0)
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Decision paths never call this; they take caller-supplied timestamps.
/// It exists for ingress stamping and the background sweeper.
pub fn epoch_ms_now() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}
