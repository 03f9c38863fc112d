use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;

use setlist::settings::store::SettingsStore;
use setlist::settings::toggle::{Toggle, flip};
use setlist::settings::{QueueMode, SettingKey, SettingsPatch};
use setlist::utils::error::BotError;

use crate::common::{fixtures, memory_store, scratch_path};
use crate::test_utils;

#[test]
fn test_settings_survive_reopening_the_database() {
    test_utils::init();
    let config = fixtures::config();
    let path = scratch_path("settings.db");

    {
        let store = SettingsStore::open(&path, config.settings_defaults()).unwrap();
        store
            .update(
                fixtures::guild(),
                &SettingsPatch::new()
                    .set(SettingKey::Volume, 65)
                    .set(SettingKey::QueueType, "FairQueue"),
            )
            .unwrap();
    }

    let store = SettingsStore::open(&path, config.settings_defaults()).unwrap();
    let settings = store.get(fixtures::guild()).unwrap();
    assert_eq!(settings.volume, 65);
    assert_eq!(settings.queue_mode, QueueMode::FairQueue);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_rejected_patch_writes_nothing() {
    let store = memory_store(&fixtures::config());
    let guild = fixtures::guild();
    store
        .update(guild, &SettingsPatch::new().set(SettingKey::Prefix, "!"))
        .unwrap();

    let result = store.update(
        guild,
        &SettingsPatch::new()
            .set(SettingKey::Prefix, "$")
            .set(SettingKey::Volume, 151),
    );

    assert_matches!(result, Err(BotError::Validation(_)));
    assert_eq!(store.raw(guild).unwrap().get("prefix"), Some(&json!("!")));
}

#[test]
fn test_only_explicit_keys_are_stored() {
    let store = memory_store(&fixtures::config());
    let guild = fixtures::guild();

    flip(&store, guild, Toggle::AlwaysOn).unwrap();

    let raw = store.raw(guild).unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw.get("24/7"), Some(&json!(true)));
    assert_eq!(store.get(guild).unwrap().prefix, "?");
}

#[test]
fn test_deleted_guild_reads_defaults_again() {
    let store = memory_store(&fixtures::config());
    let guild = fixtures::guild();
    store
        .update(guild, &SettingsPatch::new().set(SettingKey::Lang, "DE"))
        .unwrap();

    assert!(store.delete(guild).unwrap());
    assert_eq!(store.get(guild).unwrap().lang, "EN");
    assert!(!store.delete(guild).unwrap());
}

#[test]
fn test_guilds_are_isolated() {
    let store = memory_store(&fixtures::config());
    let other = serenity::model::id::GuildId::new(5);

    flip(&store, fixtures::guild(), Toggle::BypassVote).unwrap();

    assert!(!store.get(fixtures::guild()).unwrap().vote_required);
    assert!(store.get(other).unwrap().vote_required);
    assert_eq!(store.guild_count().unwrap(), 1);
}
