//! Per-user command cooldowns.
//!
//! Each (user, command) pair has an expiry instant and a flag recording
//! whether the user has already been told to wait. The check and the
//! update happen under the map's entry lock, so two messages from the same
//! user can never both pass a cooldown.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    tokio::time::Instant,
};

const CLEANUP_EVERY_CHECKS: u64 = 512;

#[derive(Debug, Clone, Copy)]
struct CooldownEntry {
    expires_at: Instant,
    notified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// No active window; a new one has started.
    Proceed,
    /// Inside an active window. `notify` is true only for the first hit.
    Wait { remaining: Duration, notify: bool },
}

#[derive(Debug, Default)]
pub struct CooldownLedger {
    entries: DashMap<String, HashMap<String, CooldownEntry>>,
    checks_seen: AtomicU64,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, user_id: &str, command: &str, wait: Duration) -> CooldownDecision {
        self.check_at(user_id, command, wait, Instant::now())
    }

    pub fn check_at(
        &self,
        user_id: &str,
        command: &str,
        wait: Duration,
        now: Instant,
    ) -> CooldownDecision {
        let fresh = CooldownEntry {
            expires_at: now + wait,
            notified: false,
        };

        let decision = match self.entries.entry(user_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let commands = occupied.get_mut();
                match commands.get_mut(command) {
                    Some(entry) if now < entry.expires_at => {
                        let notify = !entry.notified;
                        entry.notified = true;
                        CooldownDecision::Wait {
                            remaining: entry.expires_at - now,
                            notify,
                        }
                    },
                    _ => {
                        commands.insert(command.to_string(), fresh);
                        CooldownDecision::Proceed
                    },
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(HashMap::from([(command.to_string(), fresh)]));
                CooldownDecision::Proceed
            },
        };

        self.cleanup_if_needed(now);
        decision
    }

    /// Forget every window, e.g. after a reload.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of tracked (user, command) windows, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|user| user.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop windows that have expired by `now`.
    pub fn cleanup(&self, now: Instant) {
        self.entries.retain(|_, commands| {
            commands.retain(|_, entry| now < entry.expires_at);
            !commands.is_empty()
        });
    }

    fn cleanup_if_needed(&self, now: Instant) {
        let seen = self.checks_seen.fetch_add(1, Ordering::Relaxed) + 1;
        if seen.is_multiple_of(CLEANUP_EVERY_CHECKS) {
            self.cleanup(now);
        }
    }
}
