//! Live music players as seen from the configuration commands. Playback itself
//! lives behind the [`Player`] trait; this module only tracks which guild has one
//! and how to wind them all down.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use serenity::model::id::{GuildId, UserId};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::utils::error::BotResult;
use crate::utils::session;

/// The parts of a guild's player that settings commands reach into.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Player: Send + Sync {
    fn guild_id(&self) -> GuildId;

    /// Change the playback volume on behalf of `actor`.
    async fn set_volume(&self, volume: u8, actor: UserId) -> BotResult<()>;

    fn set_allow_duplicates(&self, allow: bool);

    /// Remove the controller message, if one is shown.
    async fn delete_controller(&self) -> BotResult<()>;

    /// Connected to voice and currently holding a track.
    fn is_active(&self) -> bool;

    /// Serializable state used to resume the player after a restart.
    fn data(&self) -> Value;

    async fn teardown(&self) -> BotResult<()>;
}

#[derive(Default)]
pub struct PlayerRegistry {
    players: DashMap<GuildId, Arc<dyn Player>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a player, replacing any previous one for the same guild.
    pub fn register(&self, player: Arc<dyn Player>) -> Option<Arc<dyn Player>> {
        self.players.insert(player.guild_id(), player)
    }

    pub fn unregister(&self, guild_id: GuildId) -> Option<Arc<dyn Player>> {
        self.players.remove(&guild_id).map(|(_, player)| player)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<dyn Player>> {
        self.players.get(&guild_id).map(|entry| Arc::clone(entry.value()))
    }

    /// All players ordered by guild.
    pub fn all(&self) -> Vec<Arc<dyn Player>> {
        let mut players: Vec<Arc<dyn Player>> = self
            .players
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        players.sort_by_key(|player| player.guild_id());
        players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Tear down the players of guilds whose node went away.
    pub async fn teardown_guilds(&self, guilds: &[GuildId]) {
        for guild_id in guilds {
            if let Some(player) = self.unregister(*guild_id) {
                if let Err(e) = player.teardown().await {
                    warn!("Failed to tear down orphaned player in {}: {}", guild_id, e);
                }
            }
        }
    }

    /// Snapshot every active player, tear all of them down and write the snapshots to
    /// the session file. Teardown failures are logged and do not stop the shutdown.
    ///
    /// Returns the number of sessions saved.
    pub async fn save_and_teardown(&self, session_file: &Path) -> BotResult<usize> {
        let mut snapshots = Vec::new();

        for player in self.all() {
            let guild_id = player.guild_id();
            self.unregister(guild_id);

            if !player.is_active() {
                continue;
            }
            snapshots.push(player.data());

            if let Err(e) = player.teardown().await {
                warn!("Failed to tear down player in {}: {}", guild_id, e);
            }
        }

        session::save_sessions(session_file, &snapshots)?;
        info!(
            "Saved {} player session(s) to {}",
            snapshots.len(),
            session_file.display()
        );
        Ok(snapshots.len())
    }
}
