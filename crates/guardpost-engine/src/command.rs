//! Restricted command enumeration and grant scopes.
//!
//! The set of privileged commands is closed at build time; adding a new
//! restricted command is a code change, not configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineError;

/// A privileged command eligible for allowlist grants.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RestrictedCommand {
    /// Stop the bot process.
    Shutdown,
    /// Reload the platform command registrations.
    Reset,
    /// Lock all channels for the default role.
    Lockdown,
    /// Undo a lockdown.
    Unlockdown,
    /// Bulk-delete recent messages.
    Purge,
    /// Set a channel slowmode delay.
    Slowmode,
    /// Kick a member.
    Kick,
    /// Ban a member.
    Ban,
    /// Manage allowlist grants.
    Allow,
    /// Manage anti-spam settings.
    Antispam,
}

impl RestrictedCommand {
    /// Every restricted command, in canonical order.
    pub const ALL: [RestrictedCommand; 10] = [
        RestrictedCommand::Shutdown,
        RestrictedCommand::Reset,
        RestrictedCommand::Lockdown,
        RestrictedCommand::Unlockdown,
        RestrictedCommand::Purge,
        RestrictedCommand::Slowmode,
        RestrictedCommand::Kick,
        RestrictedCommand::Ban,
        RestrictedCommand::Allow,
        RestrictedCommand::Antispam,
    ];

    /// Canonical lower-case name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            RestrictedCommand::Shutdown => "shutdown",
            RestrictedCommand::Reset => "reset",
            RestrictedCommand::Lockdown => "lockdown",
            RestrictedCommand::Unlockdown => "unlockdown",
            RestrictedCommand::Purge => "purge",
            RestrictedCommand::Slowmode => "slowmode",
            RestrictedCommand::Kick => "kick",
            RestrictedCommand::Ban => "ban",
            RestrictedCommand::Allow => "allow",
            RestrictedCommand::Antispam => "antispam",
        }
    }

    /// Parses a command name, case-insensitively.
    pub fn from_name(name: &str) -> Option<RestrictedCommand> {
        match name.to_ascii_lowercase().as_str() {
            "shutdown" => Some(RestrictedCommand::Shutdown),
            "reset" => Some(RestrictedCommand::Reset),
            "lockdown" => Some(RestrictedCommand::Lockdown),
            "unlockdown" => Some(RestrictedCommand::Unlockdown),
            "purge" => Some(RestrictedCommand::Purge),
            "slowmode" => Some(RestrictedCommand::Slowmode),
            "kick" => Some(RestrictedCommand::Kick),
            "ban" => Some(RestrictedCommand::Ban),
            "allow" => Some(RestrictedCommand::Allow),
            "antispam" => Some(RestrictedCommand::Antispam),
            _ => None,
        }
    }
}

impl fmt::Display for RestrictedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stored and displayed form of the wildcard scope.
pub const WILDCARD: &str = "*";

/// The scope of a permission grant: one command or all of them.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CommandScope {
    /// Wildcard scope covering every restricted command.
    All,
    /// A single restricted command.
    Command(RestrictedCommand),
}

impl CommandScope {
    /// Parses user input into a scope.
    ///
    /// Input is trimmed and lower-cased first. Anything outside the
    /// restricted set that is not the `"*"` wildcard is rejected.
    ///
    /// # Errors
    /// Returns `InvalidCommandName` for unknown names.
    pub fn parse(input: &str) -> Result<CommandScope, EngineError> {
        let normalized = input.trim().to_ascii_lowercase();
        if normalized == WILDCARD {
            return Ok(CommandScope::All);
        }
        match RestrictedCommand::from_name(&normalized) {
            Some(command) => Ok(CommandScope::Command(command)),
            None => Err(EngineError::InvalidCommandName { name: normalized }),
        }
    }

    /// Checks if this scope covers the given command.
    pub fn covers(&self, command: RestrictedCommand) -> bool {
        match self {
            CommandScope::All => true,
            CommandScope::Command(c) => *c == command,
        }
    }

    /// Canonical storage form: `"*"` or the command name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandScope::All => WILDCARD,
            CommandScope::Command(c) => c.name(),
        }
    }
}

impl fmt::Display for CommandScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
