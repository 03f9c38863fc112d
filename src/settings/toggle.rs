//! On/off settings flipped by a single command: read the stored flag (or its
//! default), write the negation, report the new state.

use serenity::model::id::GuildId;
use tracing::info;

use super::store::SettingsStore;
use super::{GuildSettings, SettingKey, SettingsPatch};
use crate::utils::error::BotResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// 24/7 mode: never leave the voice channel when idle.
    AlwaysOn,
    /// Skip and stop no longer need a majority vote.
    BypassVote,
    /// Whether the music controller message is shown.
    Controller,
    /// Whether the same track may be queued more than once.
    DuplicateTrack,
    /// Whether controller button presses post a message.
    ControllerMsg,
}

impl Toggle {
    pub fn key(&self) -> SettingKey {
        match self {
            Toggle::AlwaysOn => SettingKey::AlwaysOn,
            Toggle::BypassVote => SettingKey::VoteDisabled,
            Toggle::Controller => SettingKey::Controller,
            Toggle::DuplicateTrack => SettingKey::DuplicateTrack,
            Toggle::ControllerMsg => SettingKey::ControllerMsg,
        }
    }

    /// The stored flag as seen through the merged settings.
    pub fn current(&self, settings: &GuildSettings) -> bool {
        match self {
            Toggle::AlwaysOn => settings.always_on,
            Toggle::BypassVote => !settings.vote_required,
            Toggle::Controller => settings.controller_enabled,
            Toggle::DuplicateTrack => settings.duplicate_tracks_allowed,
            Toggle::ControllerMsg => settings.controller_msg_enabled,
        }
    }

    /// Human readable name used in replies.
    pub fn label(&self) -> &'static str {
        match self {
            Toggle::AlwaysOn => "24/7 mode",
            Toggle::BypassVote => "Vote bypass",
            Toggle::Controller => "Music controller",
            Toggle::DuplicateTrack => "Duplicate track prevention",
            Toggle::ControllerMsg => "Controller messages",
        }
    }

    /// Reply text for the new stored value. Duplicate tracks are phrased as the
    /// prevention feature, so its wording is inverted.
    pub fn describe(&self, stored: bool) -> String {
        let enabled = match self {
            Toggle::DuplicateTrack => !stored,
            _ => stored,
        };
        format!(
            "{} is now **{}**.",
            self.label(),
            if enabled { "enabled" } else { "disabled" }
        )
    }
}

/// Flip `toggle` for a guild and return the value now stored.
pub fn flip(store: &SettingsStore, guild_id: GuildId, toggle: Toggle) -> BotResult<bool> {
    let settings = store.get(guild_id)?;
    let next = !toggle.current(&settings);

    store.update(guild_id, &SettingsPatch::new().set(toggle.key(), next))?;
    info!("Guild {} set {} to {}", guild_id, toggle.key(), next);

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsDefaults;
    use test_case::test_case;

    #[test_case(Toggle::AlwaysOn ; "always on")]
    #[test_case(Toggle::BypassVote ; "bypass vote")]
    #[test_case(Toggle::Controller ; "controller")]
    #[test_case(Toggle::DuplicateTrack ; "duplicate track")]
    #[test_case(Toggle::ControllerMsg ; "controller msg")]
    fn test_flipping_twice_restores_original(toggle: Toggle) {
        let store = SettingsStore::open_in_memory(SettingsDefaults::default()).unwrap();
        let guild = GuildId::new(987654321);
        let original = toggle.current(&store.get(guild).unwrap());

        let first = flip(&store, guild, toggle).unwrap();
        assert_eq!(first, !original);
        assert_eq!(toggle.current(&store.get(guild).unwrap()), first);

        let second = flip(&store, guild, toggle).unwrap();
        assert_eq!(second, original);
        assert_eq!(toggle.current(&store.get(guild).unwrap()), original);
    }

    #[test]
    fn test_bypass_vote_turns_off_vote_requirement() {
        let store = SettingsStore::open_in_memory(SettingsDefaults::default()).unwrap();
        let guild = GuildId::new(5);

        assert!(flip(&store, guild, Toggle::BypassVote).unwrap());
        assert!(!store.get(guild).unwrap().vote_required);
    }

    #[test]
    fn test_duplicate_track_wording_is_inverted() {
        assert_eq!(
            Toggle::DuplicateTrack.describe(false),
            "Duplicate track prevention is now **enabled**."
        );
        assert_eq!(Toggle::AlwaysOn.describe(true), "24/7 mode is now **enabled**.");
    }
}
