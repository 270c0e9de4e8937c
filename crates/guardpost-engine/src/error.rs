//! Error types for the guardpost engine.

use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Every variant is returned to the caller as a typed result; none are
/// process-fatal. Startup failures (cache warm, store init) are promoted
/// to fatal by the daemon, not here.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The persistent store is unreachable or timed out.
    ///
    /// Access checks must treat this as deny (fail-closed); the config
    /// cache falls back to the last-known value or the default-disabled
    /// settings instead of failing the event.
    #[error("store unavailable: {reason}")]
    StoreUnavailable {
        /// Description of the underlying store failure.
        reason: String,
    },
    /// A command name outside the restricted set (and not the wildcard).
    #[error("unknown restricted command: {name}")]
    InvalidCommandName {
        /// The rejected name as supplied by the caller, lower-cased.
        name: String,
    },
    /// A numeric limiter setting outside its allowed bounds.
    #[error("{field} out of range: {value} (allowed {min}..={max})")]
    ConfigOutOfRange {
        /// Name of the offending setting.
        field: &'static str,
        /// The rejected value.
        value: u32,
        /// Minimum allowed value.
        min: u32,
        /// Maximum allowed value.
        max: u32,
    },
    /// The downstream platform rejected the mitigation action.
    #[error("mitigation apply failed: {reason}")]
    MitigationApplyFailed {
        /// Description of the platform-side failure.
        reason: String,
    },
}

impl EngineError {
    /// Builds a `StoreUnavailable` from any displayable cause.
    pub fn store_unavailable(cause: impl std::fmt::Display) -> Self {
        EngineError::StoreUnavailable {
            reason: cause.to_string(),
        }
    }
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;
