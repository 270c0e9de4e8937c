//! Per-tenant rate limiter settings.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Default window capacity for new tenants.
pub const DEFAULT_MAX_MESSAGES: u32 = 6;
/// Default window duration in seconds.
pub const DEFAULT_WINDOW_SECS: u32 = 4;
/// Default mitigation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Allowed bounds for `max_messages`.
pub const MAX_MESSAGES_RANGE: (u32, u32) = (2, 30);
/// Allowed bounds for `window_secs`.
pub const WINDOW_SECS_RANGE: (u32, u32) = (2, 30);
/// Allowed bounds for `timeout_secs`.
pub const TIMEOUT_SECS_RANGE: (u32, u32) = (5, 600);

/// Anti-spam settings for one tenant.
///
/// A tenant without a stored row is always resolved to the default before
/// any decision is made; absence never means "disabled" implicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRateConfig {
    /// Whether the limiter is active for this tenant.
    pub enabled: bool,
    /// Maximum events tolerated inside the window.
    pub max_messages: u32,
    /// Window duration in seconds.
    pub window_secs: u32,
    /// Mitigation timeout in seconds.
    pub timeout_secs: u32,
}

impl Default for TenantRateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_messages: DEFAULT_MAX_MESSAGES,
            window_secs: DEFAULT_WINDOW_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl TenantRateConfig {
    /// Window duration in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.window_secs as u64 * 1000
    }

    /// Validates the numeric settings against their allowed bounds.
    ///
    /// # Errors
    /// Returns `ConfigOutOfRange` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        check_range("max_messages", self.max_messages, MAX_MESSAGES_RANGE)?;
        check_range("window_secs", self.window_secs, WINDOW_SECS_RANGE)?;
        check_range("timeout_secs", self.timeout_secs, TIMEOUT_SECS_RANGE)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<()> {
    if value < min || value > max {
        return Err(EngineError::ConfigOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
