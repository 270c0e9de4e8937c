#![warn(missing_docs)]

//! Guardpost daemon binary.
//!
//! Wires the in-memory stores, warms the config cache (fatal on failure),
//! spawns the window sweeper, and drains inbound events until shutdown.
//! The platform glue owns the sending half of the event channel.

use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use guardpost_daemon::config::DaemonConfig;
use guardpost_daemon::membership::StaticMembership;
use guardpost_daemon::router::EventRouter;
use guardpost_engine::access::AccessResolver;
use guardpost_engine::admin::AdminService;
use guardpost_engine::cache::ConfigCache;
use guardpost_engine::mitigation::{MitigationTrigger, RecordingMitigationClient};
use guardpost_engine::rate_limit::RateLimiter;
use guardpost_engine::store::{MemoryPermissionStore, MemoryTenantConfigStore};
use guardpost_engine::sweep::spawn_sweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = DaemonConfig::parse();

    // In-memory backends; a SQL-backed deployment swaps these behind the
    // same store traits.
    let settings = Arc::new(MemoryTenantConfigStore::new());
    let grants = Arc::new(MemoryPermissionStore::new());

    let cache = Arc::new(ConfigCache::new(settings.clone()));
    let warmed = cache.warm_from_store().await?;
    tracing::info!(tenants = warmed, "config cache warmed");

    let trigger = MitigationTrigger::new(Arc::new(RecordingMitigationClient::new()));
    let limiter = Arc::new(RateLimiter::new(cache.clone(), trigger));
    let resolver = AccessResolver::new(grants.clone());
    let admin = AdminService::new(settings, grants, cache);
    let membership = Arc::new(StaticMembership::new());

    let sweeper = spawn_sweeper(limiter.clone(), config.sweep());

    let router = EventRouter::new(limiter, resolver, admin, membership);
    let (tx, rx) = mpsc::channel(config.event_queue_depth);

    let router_task = tokio::spawn(async move { router.run(rx).await });
    tracing::info!("guardpost daemon ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // Dropping the last sender lets the router drain and exit.
    drop(tx);
    router_task.await?;
    sweeper.abort();
    Ok(())
}
