use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serenity::model::id::ChannelId;
use std::sync::Arc;
use std::time::Duration;

use setlist::commands::settings::{
    matching_languages, save_request_channel, set_language, set_prefix, set_stage_template,
    set_volume, toggle_controller,
};
use setlist::players::PlayerRegistry;
use setlist::settings::toggle::{Toggle, flip};
use setlist::utils::cooldown::CooldownTracker;
use setlist::utils::error::BotError;

use crate::common::mocks::MockGuildPlayer;
use crate::common::{fixtures, memory_store};

#[rstest]
#[case("pl", "PL")]
#[case(" De ", "DE")]
#[case("EN", "EN")]
fn test_language_codes_are_normalized(#[case] input: &str, #[case] stored: &str) {
    let store = memory_store(&fixtures::config());

    assert_eq!(set_language(&store, fixtures::guild(), input).unwrap(), stored);
    assert_eq!(store.get(fixtures::guild()).unwrap().lang, stored);
}

#[test]
fn test_language_autocomplete_is_case_insensitive() {
    let config = fixtures::config();
    assert_eq!(matching_languages(&config.languages, "p"), vec!["PL"]);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("! !")]
fn test_blank_prefixes_are_rejected(#[case] prefix: &str) {
    let store = memory_store(&fixtures::config());

    assert_matches!(
        set_prefix(&store, fixtures::guild(), prefix),
        Err(BotError::Validation(_))
    );
    assert!(store.raw(fixtures::guild()).unwrap().is_empty());
}

#[tokio::test]
async fn test_volume_without_live_player_is_only_stored() {
    let store = memory_store(&fixtures::config());
    let players = PlayerRegistry::new();

    let volume = set_volume(&store, &players, fixtures::guild(), 150, fixtures::member())
        .await
        .unwrap();

    assert_eq!(volume, 150);
    assert_eq!(store.get(fixtures::guild()).unwrap().volume, 150);
}

#[tokio::test]
async fn test_player_failure_keeps_stored_volume() {
    let store = memory_store(&fixtures::config());
    let players = PlayerRegistry::new();
    let mut player = MockGuildPlayer::new();
    player.expect_guild_id().return_const(fixtures::guild());
    player
        .expect_set_volume()
        .returning(|_, _| Err(BotError::BackendUnavailable("node down".into())));
    players.register(Arc::new(player));

    let result = set_volume(&store, &players, fixtures::guild(), 30, fixtures::member()).await;

    assert_matches!(result, Err(BotError::BackendUnavailable(_)));
    assert_eq!(store.get(fixtures::guild()).unwrap().volume, 100);
}

#[tokio::test]
async fn test_controller_stays_off_when_deleting_it_fails() {
    let store = memory_store(&fixtures::config());
    let players = PlayerRegistry::new();
    let mut player = MockGuildPlayer::new();
    player.expect_guild_id().return_const(fixtures::guild());
    player
        .expect_delete_controller()
        .returning(|| Err(BotError::NotFound("message already gone".into())));
    players.register(Arc::new(player));

    assert!(!toggle_controller(&store, &players, fixtures::guild()).await.unwrap());
    assert!(!store.get(fixtures::guild()).unwrap().controller_enabled);
}

#[test]
fn test_every_toggle_reads_back_what_it_wrote() {
    let store = memory_store(&fixtures::config());
    for toggle in [
        Toggle::AlwaysOn,
        Toggle::BypassVote,
        Toggle::Controller,
        Toggle::DuplicateTrack,
        Toggle::ControllerMsg,
    ] {
        let stored = flip(&store, fixtures::guild(), toggle).unwrap();
        assert_eq!(toggle.current(&store.get(fixtures::guild()).unwrap()), stored);
    }
}

#[test]
fn test_stage_template_round_trip() {
    let store = memory_store(&fixtures::config());
    let guild = fixtures::guild();

    set_stage_template(&store, guild, Some("Now playing @@track_name@@".into())).unwrap();
    assert_eq!(
        store.get(guild).unwrap().stage_announce_template.as_deref(),
        Some("Now playing @@track_name@@")
    );

    set_stage_template(&store, guild, None).unwrap();
    assert_eq!(store.get(guild).unwrap().stage_announce_template, None);
}

#[test]
fn test_request_channel_replaces_previous_one() {
    let store = memory_store(&fixtures::config());
    let guild = fixtures::guild();

    save_request_channel(&store, guild, ChannelId::new(1), 2).unwrap();
    let channel = save_request_channel(&store, guild, ChannelId::new(3), 4).unwrap();

    assert_eq!(store.get(guild).unwrap().music_request_channel, Some(channel));
    assert_eq!(channel.text_channel_id, 3);
}

#[test]
fn test_cooldown_is_per_guild_and_command() {
    let tracker = CooldownTracker::new(Duration::from_secs(3), Default::default());
    let other = serenity::model::id::GuildId::new(2);

    assert!(tracker.try_use(fixtures::guild(), "settings volume").is_ok());
    assert!(tracker.try_use(fixtures::guild(), "settings volume").is_err());
    assert!(tracker.try_use(fixtures::guild(), "settings prefix").is_ok());
    assert!(tracker.try_use(other, "settings volume").is_ok());
}
