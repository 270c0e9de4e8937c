//! Mitigation actions applied when the rate threshold is exceeded.
//!
//! The actual restriction is an external platform side effect with its
//! own failure domain; the trigger computes the expiry instant and maps
//! client failures into the engine taxonomy.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::error::Result;
use crate::types::{GuildId, UserId};

/// Platform client that applies or clears time-boxed restrictions.
///
/// Implementations wrap the messaging platform's member-edit API; network
/// and privilege failures surface as `MitigationApplyFailed`.
#[async_trait]
pub trait MitigationActionClient: Send + Sync {
    /// Restricts the actor from communicating until `until`.
    async fn apply_timeout(
        &self,
        guild: GuildId,
        user: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()>;

    /// Lifts any active restriction on the actor.
    async fn clear_timeout(&self, guild: GuildId, user: UserId) -> Result<()>;
}

/// Fires mitigation actions with computed expiry instants.
pub struct MitigationTrigger {
    client: Arc<dyn MitigationActionClient>,
}

impl MitigationTrigger {
    /// Creates a trigger over the given platform client.
    pub fn new(client: Arc<dyn MitigationActionClient>) -> Self {
        Self { client }
    }

    /// Applies a restriction expiring `timeout_secs` from now.
    ///
    /// # Errors
    /// Returns `MitigationApplyFailed` when the platform rejects the
    /// restriction; the caller logs and continues.
    pub async fn apply(
        &self,
        guild: GuildId,
        user: UserId,
        timeout_secs: u32,
        reason: &str,
    ) -> Result<()> {
        let until = Utc::now() + Duration::seconds(timeout_secs as i64);
        self.client.apply_timeout(guild, user, until, reason).await?;
        info!(%guild, %user, timeout_secs, "mitigation applied");
        Ok(())
    }

    /// Lifts any active restriction on the actor.
    pub async fn clear(&self, guild: GuildId, user: UserId) -> Result<()> {
        self.client.clear_timeout(guild, user).await
    }
}

/// A restriction recorded by [`RecordingMitigationClient`].
#[derive(Clone, Debug)]
pub struct RecordedTimeout {
    /// Guild the restriction was applied in.
    pub guild: GuildId,
    /// Restricted actor.
    pub user: UserId,
    /// When the restriction expires.
    pub until: DateTime<Utc>,
    /// Reason string passed to the platform.
    pub reason: String,
}

/// Client that records restrictions in memory instead of calling the
/// platform. Used by tests and dry-run deployments.
pub struct RecordingMitigationClient {
    applied: Mutex<Vec<RecordedTimeout>>,
}

impl RecordingMitigationClient {
    /// Creates a client with no recorded restrictions.
    pub fn new() -> Self {
        Self {
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every restriction applied so far.
    pub fn applied(&self) -> Vec<RecordedTimeout> {
        self.applied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for RecordingMitigationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MitigationActionClient for RecordingMitigationClient {
    async fn apply_timeout(
        &self,
        guild: GuildId,
        user: UserId,
        until: DateTime<Utc>,
        reason: &str,
    ) -> Result<()> {
        self.applied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedTimeout {
                guild,
                user,
                until,
                reason: reason.to_string(),
            });
        Ok(())
    }

    async fn clear_timeout(&self, guild: GuildId, user: UserId) -> Result<()> {
        self.applied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|r| !(r.guild == guild && r.user == user));
        Ok(())
    }
}

/// Client whose every call fails, for failure-path tests.
#[cfg(test)]
pub(crate) struct FailingMitigationClient;

#[cfg(test)]
use crate::error::EngineError;

#[cfg(test)]
#[async_trait]
impl MitigationActionClient for FailingMitigationClient {
    async fn apply_timeout(
        &self,
        _guild: GuildId,
        _user: UserId,
        _until: DateTime<Utc>,
        _reason: &str,
    ) -> Result<()> {
        Err(EngineError::MitigationApplyFailed {
            reason: "missing permission".to_string(),
        })
    }

    async fn clear_timeout(&self, _guild: GuildId, _user: UserId) -> Result<()> {
        Err(EngineError::MitigationApplyFailed {
            reason: "missing permission".to_string(),
        })
    }
}
