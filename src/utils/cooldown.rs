//! Per-guild, per-command rate limiting for the settings commands.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serenity::model::id::GuildId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::debug;

pub struct CooldownTracker {
    default: Duration,
    overrides: HashMap<String, Duration>,
    last_used: DashMap<(GuildId, String), Instant>,
}

impl CooldownTracker {
    pub fn new(default: Duration, overrides: HashMap<String, Duration>) -> Self {
        Self {
            default,
            overrides,
            last_used: DashMap::new(),
        }
    }

    pub fn cooldown_for(&self, command: &str) -> Duration {
        self.overrides.get(command).copied().unwrap_or(self.default)
    }

    /// Record a use of `command` in `guild_id` unless it is still cooling down, in
    /// which case the remaining wait is returned and nothing is recorded.
    pub fn try_use(&self, guild_id: GuildId, command: &str) -> Result<(), Duration> {
        self.try_use_at(guild_id, command, Instant::now())
    }

    fn try_use_at(&self, guild_id: GuildId, command: &str, now: Instant) -> Result<(), Duration> {
        let cooldown = self.cooldown_for(command);
        if cooldown.is_zero() {
            return Ok(());
        }

        match self.last_used.entry((guild_id, command.to_string())) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                Ok(())
            }
            Entry::Occupied(mut slot) => {
                let elapsed = now.saturating_duration_since(*slot.get());
                if elapsed < cooldown {
                    return Err(cooldown - elapsed);
                }
                slot.insert(now);
                Ok(())
            }
        }
    }

    /// Forget entries whose cooldown has run out. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let before = self.last_used.len();
        self.last_used.retain(|(_, command), used| {
            now.saturating_duration_since(*used) < self.cooldown_for(command)
        });
        before.saturating_sub(self.last_used.len())
    }

    pub fn len(&self) -> usize {
        self.last_used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_used.is_empty()
    }
}

/// Prune `tracker` on a fixed interval until the returned handle is aborted.
pub fn spawn_pruner(tracker: Arc<CooldownTracker>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let dropped = tracker.prune();
            if dropped > 0 {
                debug!("Pruned {} expired cooldown(s)", dropped);
            }
        }
    })
}
