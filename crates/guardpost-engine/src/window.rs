//! Per-actor sliding activity windows.
//!
//! Owned exclusively by the rate limiter. Each (guild, user) key holds
//! the timestamps of that actor's recent events; the window is pruned on
//! every observation and cleared to empty when a mitigation fires.

use dashmap::DashMap;

use crate::types::{GuildId, UserId};

/// Outcome of recording one event against a window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowUpdate {
    /// Event recorded; window length is within the allowed capacity.
    Within {
        /// Number of events currently inside the window.
        len: usize,
    },
    /// Capacity exceeded; the window was reset to empty.
    Exceeded,
}

/// Concurrent store of sliding activity windows.
///
/// DashMap shards serialize updates per key, so append, prune, and reset
/// happen atomically with respect to concurrent events for the same
/// actor; two near-simultaneous events can never both observe a length
/// just under the threshold and both pass.
pub struct ActivityWindowStore {
    windows: DashMap<(GuildId, UserId), Vec<u64>>,
}

impl ActivityWindowStore {
    /// Creates an empty window store.
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Records an event and evaluates the window against its capacity.
    ///
    /// Timestamps older than `window_ms` before `now_ms` are dropped; a
    /// timestamp exactly `window_ms` old is retained. A window that grows
    /// strictly beyond `max_messages` is cleared to empty (the one-shot
    /// reset) and `Exceeded` is returned.
    pub fn record(
        &self,
        guild: GuildId,
        user: UserId,
        now_ms: u64,
        window_ms: u64,
        max_messages: u32,
    ) -> WindowUpdate {
        let mut entry = self.windows.entry((guild, user)).or_default();
        entry.push(now_ms);
        let cutoff = now_ms.saturating_sub(window_ms);
        entry.retain(|&t| t >= cutoff);
        if entry.len() > max_messages as usize {
            entry.clear();
            WindowUpdate::Exceeded
        } else {
            WindowUpdate::Within { len: entry.len() }
        }
    }

    /// Number of actors currently holding window state.
    pub fn active_keys(&self) -> usize {
        self.windows.len()
    }

    /// Current window length for an actor, if any state exists.
    pub fn len_of(&self, guild: GuildId, user: UserId) -> Option<usize> {
        self.windows.get(&(guild, user)).map(|entry| entry.len())
    }

    /// Drops entries whose newest timestamp predates `now_ms` by more
    /// than the owning guild's window duration, plus entries already
    /// emptied by a mitigation reset. Returns the number evicted.
    ///
    /// `window_ms_of` resolves the window duration per guild so tenants
    /// with long windows keep their state.
    pub fn sweep_stale(
        &self,
        now_ms: u64,
        mut window_ms_of: impl FnMut(GuildId) -> u64,
    ) -> usize {
        let before = self.windows.len();
        self.windows.retain(|(guild, _), stamps| match stamps.last() {
            Some(&newest) => now_ms.saturating_sub(newest) <= window_ms_of(*guild),
            None => false,
        });
        before.saturating_sub(self.windows.len())
    }
}

impl Default for ActivityWindowStore {
    fn default() -> Self {
        Self::new()
    }
}
