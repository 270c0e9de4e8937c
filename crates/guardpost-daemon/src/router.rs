//! Inbound event routing.
//!
//! The platform glue turns gateway traffic into [`InboundEvent`]s.
//! Activity and join events stream through [`EventRouter::run`]; command
//! invocations go through [`EventRouter::dispatch`] directly, since the
//! glue needs the [`CommandOutcome`] to render a response. Access control
//! is enforced here, before any admin operation executes, and a store
//! failure during the check denies (fail-closed).

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use guardpost_engine::access::{AccessResolver, MemberContext};
use guardpost_engine::admin::AdminService;
use guardpost_engine::command::{CommandScope, RestrictedCommand, WILDCARD};
use guardpost_engine::config::TenantRateConfig;
use guardpost_engine::error::EngineError;
use guardpost_engine::rate_limit::{RateDecision, RateLimiter};
use guardpost_engine::store::PermissionGrant;
use guardpost_engine::types::{GuildId, RoleFlags, UserId};

use crate::membership::MembershipProvider;

/// A non-automated actor's message, stripped to what the limiter needs.
#[derive(Clone, Debug, Serialize)]
pub struct ActivityEvent {
    /// Guild the message was sent in.
    pub guild: GuildId,
    /// Message author.
    pub user: UserId,
    /// Ingress timestamp in epoch milliseconds.
    pub timestamp_ms: u64,
}

/// Parameters of the restricted operations the router executes.
#[derive(Clone, Debug)]
pub enum AdminRequest {
    /// Add an allowlist grant for a target actor.
    AllowAdd {
        /// Actor receiving the grant.
        target: UserId,
        /// Raw scope input: a command name or `"*"`.
        scope: String,
    },
    /// Remove an allowlist grant from a target actor.
    AllowRemove {
        /// Actor losing the grant.
        target: UserId,
        /// Raw scope input: a command name or `"*"`.
        scope: String,
    },
    /// List grants, optionally filtered by command name.
    AllowList {
        /// Raw scope filter; `None` lists everything.
        scope: Option<String>,
    },
    /// Enable or disable the rate limiter.
    AntispamSet {
        /// Desired state.
        enabled: bool,
    },
    /// Update the rate limiter thresholds.
    AntispamConfigure {
        /// Window capacity.
        max_messages: u32,
        /// Window duration in seconds.
        window_secs: u32,
        /// Mitigation timeout in seconds.
        timeout_secs: u32,
    },
}

impl AdminRequest {
    /// The restricted command this request falls under for access checks.
    pub fn command(&self) -> RestrictedCommand {
        match self {
            AdminRequest::AllowAdd { .. }
            | AdminRequest::AllowRemove { .. }
            | AdminRequest::AllowList { .. } => RestrictedCommand::Allow,
            AdminRequest::AntispamSet { .. } | AdminRequest::AntispamConfigure { .. } => {
                RestrictedCommand::Antispam
            }
        }
    }
}

/// A privileged-operation attempt.
#[derive(Clone, Debug)]
pub struct CommandInvocation {
    /// Guild the command was invoked in.
    pub guild: GuildId,
    /// Invoking actor.
    pub user: UserId,
    /// Role capabilities carried by the platform event payload.
    pub roles: RoleFlags,
    /// The operation and its parameters.
    pub request: AdminRequest,
}

/// An event delivered to the router.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    /// A member message.
    Activity(ActivityEvent),
    /// A privileged command invocation.
    Command(CommandInvocation),
    /// First contact with a guild.
    GuildJoin {
        /// The newly joined guild.
        guild: GuildId,
    },
}

/// Result of routing one command invocation, handed to the rendering
/// layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum CommandOutcome {
    /// The actor is not allowed to run the command.
    Denied,
    /// A grant was added.
    GrantAdded {
        /// Actor that received the grant.
        target: UserId,
        /// Scope granted.
        scope: CommandScope,
    },
    /// A grant was removed.
    GrantRemoved {
        /// Actor that lost the grant.
        target: UserId,
        /// Scope revoked.
        scope: CommandScope,
    },
    /// The guild's grants, per the requested filter.
    Grants(Vec<PermissionGrant>),
    /// The limiter was toggled; the resulting settings.
    AntispamToggled(TenantRateConfig),
    /// The limiter thresholds were updated; the resulting settings.
    AntispamConfigured(TenantRateConfig),
    /// Input rejected before any persistence (bad name, out-of-range).
    Rejected {
        /// Human-readable rejection reason.
        reason: String,
    },
    /// The operation failed mid-flight (store unreachable).
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

/// Routes inbound events to the engine components.
pub struct EventRouter {
    limiter: Arc<RateLimiter>,
    resolver: AccessResolver,
    admin: AdminService,
    membership: Arc<dyn MembershipProvider>,
}

impl EventRouter {
    /// Creates a router over the assembled engine.
    pub fn new(
        limiter: Arc<RateLimiter>,
        resolver: AccessResolver,
        admin: AdminService,
        membership: Arc<dyn MembershipProvider>,
    ) -> Self {
        Self {
            limiter,
            resolver,
            admin,
            membership,
        }
    }

    /// Handles one inbound event to completion.
    ///
    /// Activity and join events yield no outcome; command invocations
    /// yield the outcome the rendering layer reports back.
    pub async fn dispatch(&self, event: InboundEvent) -> Option<CommandOutcome> {
        match event {
            InboundEvent::Activity(activity) => {
                let decision = self
                    .limiter
                    .observe(activity.guild, activity.user, activity.timestamp_ms)
                    .await;
                if let RateDecision::Mitigated { timeout_secs } = decision {
                    info!(
                        guild = %activity.guild,
                        user = %activity.user,
                        timeout_secs,
                        "rate threshold exceeded, actor restricted"
                    );
                }
                None
            }
            InboundEvent::GuildJoin { guild } => {
                if let Err(err) = self.admin.ensure_tenant(guild).await {
                    warn!(%guild, error = %err, "tenant setup failed on join");
                }
                None
            }
            InboundEvent::Command(invocation) => Some(self.handle_command(invocation).await),
        }
    }

    async fn handle_command(&self, invocation: CommandInvocation) -> CommandOutcome {
        let CommandInvocation {
            guild,
            user,
            roles,
            request,
        } = invocation;

        let owner_id = match self.membership.owner_of(guild).await {
            Ok(owner_id) => owner_id,
            Err(err) => {
                warn!(%guild, %user, error = %err, "owner lookup failed, denying");
                return CommandOutcome::Denied;
            }
        };
        let member = MemberContext::new(owner_id, roles);

        match self
            .resolver
            .authorize(guild, user, &member, request.command())
            .await
        {
            Ok(true) => {}
            Ok(false) => return CommandOutcome::Denied,
            Err(err) => {
                // Fail-closed: an unreachable grant store denies.
                warn!(%guild, %user, error = %err, "authorization check failed, denying");
                return CommandOutcome::Denied;
            }
        }

        self.execute(guild, user, request).await
    }

    async fn execute(&self, guild: GuildId, user: UserId, request: AdminRequest) -> CommandOutcome {
        match request {
            AdminRequest::AllowAdd { target, scope } => match CommandScope::parse(&scope) {
                Ok(scope) => match self.admin.grant(guild, target, scope, user).await {
                    Ok(()) => CommandOutcome::GrantAdded { target, scope },
                    Err(err) => CommandOutcome::Failed {
                        reason: err.to_string(),
                    },
                },
                Err(err) => CommandOutcome::Rejected {
                    reason: err.to_string(),
                },
            },
            AdminRequest::AllowRemove { target, scope } => match CommandScope::parse(&scope) {
                Ok(scope) => match self.admin.revoke(guild, target, scope).await {
                    Ok(()) => CommandOutcome::GrantRemoved { target, scope },
                    Err(err) => CommandOutcome::Failed {
                        reason: err.to_string(),
                    },
                },
                Err(err) => CommandOutcome::Rejected {
                    reason: err.to_string(),
                },
            },
            AdminRequest::AllowList { scope } => {
                let filter = scope.as_deref().unwrap_or(WILDCARD);
                match CommandScope::parse(filter) {
                    Ok(filter) => match self.admin.list_grants(guild, filter).await {
                        Ok(grants) => CommandOutcome::Grants(grants),
                        Err(err) => CommandOutcome::Failed {
                            reason: err.to_string(),
                        },
                    },
                    Err(err) => CommandOutcome::Rejected {
                        reason: err.to_string(),
                    },
                }
            }
            AdminRequest::AntispamSet { enabled } => {
                match self.admin.set_enabled(guild, enabled).await {
                    Ok(config) => CommandOutcome::AntispamToggled(config),
                    Err(err) => CommandOutcome::Failed {
                        reason: err.to_string(),
                    },
                }
            }
            AdminRequest::AntispamConfigure {
                max_messages,
                window_secs,
                timeout_secs,
            } => {
                match self
                    .admin
                    .configure(guild, max_messages, window_secs, timeout_secs)
                    .await
                {
                    Ok(config) => CommandOutcome::AntispamConfigured(config),
                    Err(err @ EngineError::ConfigOutOfRange { .. }) => CommandOutcome::Rejected {
                        reason: err.to_string(),
                    },
                    Err(err) => CommandOutcome::Failed {
                        reason: err.to_string(),
                    },
                }
            }
        }
    }

    /// Consumes events from the channel until every sender is dropped.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundEvent>) {
        while let Some(event) = rx.recv().await {
            if let Some(outcome) = self.dispatch(event).await {
                debug!(?outcome, "command handled");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::StaticMembership;
    use guardpost_engine::cache::ConfigCache;
    use guardpost_engine::mitigation::{MitigationTrigger, RecordingMitigationClient};
    use guardpost_engine::store::{
        MemoryPermissionStore, MemoryTenantConfigStore, TenantConfigStore,
    };

    struct Harness {
        router: EventRouter,
        membership: Arc<StaticMembership>,
        mitigations: Arc<RecordingMitigationClient>,
        settings: Arc<MemoryTenantConfigStore>,
    }

    async fn harness() -> Harness {
        let settings = Arc::new(MemoryTenantConfigStore::new());
        let grants = Arc::new(MemoryPermissionStore::new());
        let cache = Arc::new(ConfigCache::new(settings.clone()));
        cache.warm_from_store().await.unwrap();

        let mitigations = Arc::new(RecordingMitigationClient::new());
        let limiter = Arc::new(RateLimiter::new(
            cache.clone(),
            MitigationTrigger::new(mitigations.clone()),
        ));
        let resolver = AccessResolver::new(grants.clone());
        let admin = AdminService::new(settings.clone(), grants, cache);
        let membership = Arc::new(StaticMembership::new());
        membership.set_owner(GuildId::new(1), UserId::new(100));

        Harness {
            router: EventRouter::new(limiter, resolver, admin, membership.clone()),
            membership,
            mitigations,
            settings,
        }
    }

    fn command(user: u64, roles: RoleFlags, request: AdminRequest) -> InboundEvent {
        InboundEvent::Command(CommandInvocation {
            guild: GuildId::new(1),
            user: UserId::new(user),
            roles,
            request,
        })
    }

    #[tokio::test]
    async fn test_owner_configures_antispam() {
        let h = harness().await;
        let outcome = h
            .router
            .dispatch(command(
                100,
                RoleFlags::NONE,
                AdminRequest::AntispamConfigure {
                    max_messages: 3,
                    window_secs: 5,
                    timeout_secs: 20,
                },
            ))
            .await
            .unwrap();
        match outcome {
            CommandOutcome::AntispamConfigured(config) => {
                assert!(config.enabled);
                assert_eq!(config.max_messages, 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.settings.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unprivileged_actor_denied() {
        let h = harness().await;
        let outcome = h
            .router
            .dispatch(command(
                2,
                RoleFlags::NONE,
                AdminRequest::AntispamSet { enabled: true },
            ))
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Denied);
        assert!(h.settings.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_admin_role_allowed() {
        let h = harness().await;
        let outcome = h
            .router
            .dispatch(command(
                2,
                RoleFlags::ADMINISTRATOR,
                AdminRequest::AntispamSet { enabled: true },
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::AntispamToggled(_)));
    }

    #[tokio::test]
    async fn test_granted_actor_can_manage_grants() {
        let h = harness().await;
        // Owner delegates the allow command itself.
        let outcome = h
            .router
            .dispatch(command(
                100,
                RoleFlags::NONE,
                AdminRequest::AllowAdd {
                    target: UserId::new(2),
                    scope: "allow".to_string(),
                },
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::GrantAdded { .. }));

        // The delegate can now grant others.
        let outcome = h
            .router
            .dispatch(command(
                2,
                RoleFlags::NONE,
                AdminRequest::AllowAdd {
                    target: UserId::new(3),
                    scope: "purge".to_string(),
                },
            ))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::GrantAdded {
                target: UserId::new(3),
                scope: CommandScope::parse("purge").unwrap(),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_command_name_rejected() {
        let h = harness().await;
        let outcome = h
            .router
            .dispatch(command(
                100,
                RoleFlags::NONE,
                AdminRequest::AllowAdd {
                    target: UserId::new(2),
                    scope: "frobnicate".to_string(),
                },
            ))
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_out_of_range_config_rejected() {
        let h = harness().await;
        let outcome = h
            .router
            .dispatch(command(
                100,
                RoleFlags::NONE,
                AdminRequest::AntispamConfigure {
                    max_messages: 1,
                    window_secs: 4,
                    timeout_secs: 30,
                },
            ))
            .await
            .unwrap();
        match outcome {
            CommandOutcome::Rejected { reason } => {
                assert!(reason.contains("max_messages"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_guild_owner_denies() {
        let h = harness().await;
        let outcome = h
            .router
            .dispatch(InboundEvent::Command(CommandInvocation {
                guild: GuildId::new(999),
                user: UserId::new(100),
                roles: RoleFlags::NONE,
                request: AdminRequest::AntispamSet { enabled: true },
            }))
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Denied);
    }

    #[tokio::test]
    async fn test_activity_stream_fires_mitigation() {
        let h = harness().await;
        // Enable with tight thresholds, then spam.
        let _ = h
            .router
            .dispatch(command(
                100,
                RoleFlags::NONE,
                AdminRequest::AntispamConfigure {
                    max_messages: 2,
                    window_secs: 5,
                    timeout_secs: 20,
                },
            ))
            .await;

        for t in [0u64, 100, 200] {
            let outcome = h
                .router
                .dispatch(InboundEvent::Activity(ActivityEvent {
                    guild: GuildId::new(1),
                    user: UserId::new(7),
                    timestamp_ms: t,
                }))
                .await;
            assert!(outcome.is_none());
        }
        assert_eq!(h.mitigations.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_guild_join_ensures_tenant_row() {
        let h = harness().await;
        let _ = h
            .router
            .dispatch(InboundEvent::GuildJoin {
                guild: GuildId::new(1),
            })
            .await;
        let rows = h.settings.read_all().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].1.enabled);
    }

    #[tokio::test]
    async fn test_allow_list_default_filter() {
        let h = harness().await;
        let _ = h
            .router
            .dispatch(command(
                100,
                RoleFlags::NONE,
                AdminRequest::AllowAdd {
                    target: UserId::new(2),
                    scope: "kick".to_string(),
                },
            ))
            .await;
        let outcome = h
            .router
            .dispatch(command(
                100,
                RoleFlags::NONE,
                AdminRequest::AllowList { scope: None },
            ))
            .await
            .unwrap();
        match outcome {
            CommandOutcome::Grants(grants) => assert_eq!(grants.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_drains_channel() {
        let h = harness().await;
        h.membership.set_owner(GuildId::new(1), UserId::new(100));
        let (tx, rx) = mpsc::channel(16);
        tx.send(InboundEvent::GuildJoin {
            guild: GuildId::new(1),
        })
        .await
        .unwrap();
        drop(tx);
        h.router.run(rx).await;
        assert_eq!(h.settings.read_all().await.unwrap().len(), 1);
    }
}
