use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use setlist::settings::{SettingKey, SettingsPatch};
use setlist::utils::error::BotError;
use setlist::utils::evaluator::Evaluator;

use crate::common::mocks::healthy_connector;
use crate::common::{fixtures, test_data};

#[test]
fn test_console_is_restricted_to_maintainers() {
    let data = test_data(fixtures::config(), healthy_connector());

    assert_matches!(
        Evaluator::new(&data).run(fixtures::member(), "uptime"),
        Err(BotError::PermissionDenied(_))
    );
}

#[test]
fn test_script_output_is_numbered() {
    let data = test_data(fixtures::config(), healthy_connector());

    let evaluation = Evaluator::new(&data)
        .run(fixtures::maintainer(), "```\necho hello\nlanguages\n```")
        .unwrap();

    assert!(!evaluation.failed());
    assert_eq!(evaluation.rendered, "001 | hello\n002 | EN, PL, DE\n003 | -- ok");
}

#[tokio::test]
async fn test_nodes_lists_registered_nodes() {
    let data = test_data(fixtures::config(), healthy_connector());
    data.registry.add(fixtures::node_config("main")).await.unwrap();

    let evaluation = Evaluator::new(&data)
        .run(fixtures::maintainer(), "nodes")
        .unwrap();

    assert!(evaluation.rendered.contains("UP   main 127.0.0.1:2333 players=0"));
}

#[test]
fn test_settings_dump_shows_stored_keys_only() {
    let data = test_data(fixtures::config(), healthy_connector());
    data.store
        .update(fixtures::guild(), &SettingsPatch::new().set(SettingKey::Volume, 42))
        .unwrap();

    let evaluation = Evaluator::new(&data)
        .run(
            fixtures::maintainer(),
            &format!("settings {}", fixtures::SAMPLE_GUILD_ID),
        )
        .unwrap();

    assert!(evaluation.rendered.contains("\"volume\": 42"));
    assert!(!evaluation.rendered.contains("prefix"));
}

#[test]
fn test_first_failure_stops_the_script() {
    let data = test_data(fixtures::config(), healthy_connector());

    let evaluation = Evaluator::new(&data)
        .run(fixtures::maintainer(), "echo one\nnode missing\necho two")
        .unwrap();

    assert!(evaluation.failed());
    assert_eq!(evaluation.rendered, "NotFound: Not found: Node `missing` was not found");
    assert_matches!(evaluation.error, Some(BotError::NotFound(_)));
}
