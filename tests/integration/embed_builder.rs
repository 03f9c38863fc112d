use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use setlist::commands::embed_builder::{BuilderAction, apply_form};
use setlist::settings::builder::{EmbedBuilderSession, SessionState};
use setlist::settings::embed::{ControllerState, Placeholders, render};
use setlist::utils::error::BotError;

use crate::common::{fixtures, memory_store};

fn form(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_apply_persists_whole_template_set() {
    let store = memory_store(&fixtures::config());
    let guild = fixtures::guild();
    let mut session = EmbedBuilderSession::from_store(&store, guild, fixtures::member()).unwrap();

    apply_form(
        &mut session,
        BuilderAction::Content,
        &form(&["@@track_name@@", "", "#ff0000", "Requested by @@requester@@"]),
    )
    .unwrap();
    session.select(ControllerState::Inactive).unwrap();
    apply_form(&mut session, BuilderAction::Footer, &form(&["Idle on @@bot_name@@", ""])).unwrap();

    let saved = session.apply(&store, guild).unwrap();

    assert_eq!(session.state(), SessionState::Persisted);
    assert_eq!(saved.default_controller.active.color, Some(0xff0000));
    assert_eq!(
        store.get(guild).unwrap().default_controller,
        *session.working()
    );
}

#[test]
fn test_reset_restores_snapshot_and_keeps_session_open() {
    let store = memory_store(&fixtures::config());
    let guild = fixtures::guild();
    let mut session = EmbedBuilderSession::from_store(&store, guild, fixtures::member()).unwrap();
    let original = session.working().clone();

    apply_form(&mut session, BuilderAction::Author, &form(&["DJ", "", ""])).unwrap();
    session.reset().unwrap();

    assert_eq!(*session.working(), original);
    assert_eq!(session.state(), SessionState::Editing);
    assert!(store.raw(guild).unwrap().is_empty());
}

#[test]
fn test_closed_session_refuses_edits() {
    let store = memory_store(&fixtures::config());
    let mut session =
        EmbedBuilderSession::from_store(&store, fixtures::guild(), fixtures::member()).unwrap();
    session.discard();

    assert_matches!(
        apply_form(&mut session, BuilderAction::AddField, &form(&["a", "b", "false"])),
        Err(BotError::SessionClosed)
    );
    assert_matches!(session.apply(&store, fixtures::guild()), Err(BotError::SessionClosed));
}

#[test]
fn test_rendered_preview_substitutes_placeholders() {
    let store = memory_store(&fixtures::config());
    let mut session =
        EmbedBuilderSession::from_store(&store, fixtures::guild(), fixtures::member()).unwrap();
    apply_form(
        &mut session,
        BuilderAction::Content,
        &form(&["Now: @@track_name@@", "@@track_url@@", "", "@@unknown@@"]),
    )
    .unwrap();

    let ph = Placeholders::idle("Setlist", "https://cdn.example.com/bot.png", "")
        .with_sample_track();
    let embed = serde_json::to_value(render(session.current(), &ph)).unwrap();

    assert_eq!(embed["title"], "Now: Never Gonna Give You Up");
    assert_eq!(embed["url"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    assert_eq!(embed["description"], "@@unknown@@");
}
