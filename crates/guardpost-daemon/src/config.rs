//! Runtime configuration for the guardpost daemon.

use std::time::Duration;

use clap::Parser;
use guardpost_engine::sweep::SweepConfig;

/// Command-line and environment configuration for `gp-daemon`.
#[derive(Debug, Parser)]
#[command(name = "gp-daemon")]
#[command(about = "Guardpost access-control and anti-abuse daemon", long_about = None)]
pub struct DaemonConfig {
    /// Seconds between idle-window sweep passes.
    #[arg(long, env = "GP_SWEEP_INTERVAL_SECS", default_value = "60")]
    pub sweep_interval_secs: u64,

    /// Disables the background window sweeper.
    #[arg(long, env = "GP_SWEEP_DISABLED")]
    pub sweep_disabled: bool,

    /// Capacity of the inbound event channel.
    #[arg(long, env = "GP_EVENT_QUEUE_DEPTH", default_value = "1024")]
    pub event_queue_depth: usize,
}

impl DaemonConfig {
    /// Sweeper configuration derived from the flags.
    pub fn sweep(&self) -> SweepConfig {
        SweepConfig {
            interval: Duration::from_secs(self.sweep_interval_secs),
            enabled: !self.sweep_disabled,
        }
    }
}
