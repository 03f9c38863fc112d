use pretty_assertions::assert_eq;
use serenity::model::id::GuildId;
use std::sync::Arc;

use setlist::players::PlayerRegistry;
use setlist::utils::error::BotError;
use setlist::utils::session::load_sessions;

use crate::common::mocks::{MockGuildPlayer, idle_player};
use crate::common::scratch_path;

#[tokio::test]
async fn test_shutdown_saves_only_active_players() {
    let path = scratch_path("shutdown-sessions.json");
    std::fs::write(&path, r#"[{"guild_id": 1}]"#).unwrap();

    let players = PlayerRegistry::new();
    players.register(Arc::new(idle_player(GuildId::new(10), true)));
    players.register(Arc::new(idle_player(GuildId::new(20), false)));
    players.register(Arc::new(idle_player(GuildId::new(30), true)));

    let saved = players.save_and_teardown(&path).await.unwrap();

    assert_eq!(saved, 2);
    assert!(players.is_empty());
    let sessions = load_sessions(&path).unwrap();
    let guilds: Vec<u64> = sessions
        .iter()
        .map(|s| s["guild_id"].as_u64().unwrap())
        .collect();
    assert_eq!(guilds, vec![10, 30]);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_failed_teardown_does_not_stop_shutdown() {
    let path = scratch_path("failing-teardown.json");
    let players = PlayerRegistry::new();

    let mut stubborn = MockGuildPlayer::new();
    stubborn.expect_guild_id().return_const(GuildId::new(7));
    stubborn.expect_is_active().return_const(true);
    stubborn
        .expect_data()
        .returning(|| serde_json::json!({"guild_id": 7}));
    stubborn
        .expect_teardown()
        .returning(|| Err(BotError::BackendUnavailable("voice gateway closed".into())));
    players.register(Arc::new(stubborn));
    players.register(Arc::new(idle_player(GuildId::new(8), true)));

    assert_eq!(players.save_and_teardown(&path).await.unwrap(), 2);
    assert_eq!(load_sessions(&path).unwrap().len(), 2);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_missing_session_file_is_empty() {
    let path = scratch_path("never-written.json");
    assert!(load_sessions(&path).unwrap().is_empty());
}
