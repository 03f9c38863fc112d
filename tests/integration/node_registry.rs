use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use setlist::commands::nodes_panel::{nodes_embed, remove_node};
use setlist::nodes::NodeConfig;
use setlist::nodes::connector::HttpNodeConnector;
use setlist::nodes::registry::NodeRegistry;
use setlist::players::PlayerRegistry;
use setlist::utils::error::BotError;

use crate::common::fixtures::{self, node_config};
use crate::common::mocks::{MockConnector, MockGuildPlayer, healthy_connector};
use crate::test_utils;

fn node_for(server: &MockServer, identifier: &str) -> NodeConfig {
    let uri = url::Url::parse(&server.uri()).unwrap();
    NodeConfig {
        identifier: identifier.to_string(),
        host: uri.host_str().unwrap().to_string(),
        port: uri.port().unwrap(),
        password: "youshallnotpass".to_string(),
        secure: false,
    }
}

#[tokio::test]
async fn test_http_node_lifecycle() {
    test_utils::init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .and(header("Authorization", "youshallnotpass"))
        .respond_with(ResponseTemplate::new(200).set_body_string("4.0.8"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v4/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "players": 3,
            "playingPlayers": 2,
            "uptime": 123456,
            "memory": {"free": 100, "used": 300, "allocated": 400, "reservable": 1000},
            "cpu": {"cores": 2, "systemLoad": 0.5, "lavalinkLoad": 0.25}
        })))
        .mount(&server)
        .await;

    let connector = HttpNodeConnector::new(Duration::from_secs(5)).unwrap();
    let registry = NodeRegistry::new(Arc::new(connector));

    let added = registry.add(node_for(&server, "local")).await.unwrap();
    assert!(added.available);

    registry.refresh_stats().await;
    let node = registry.get("local").unwrap();
    let stats = node.stats.unwrap();
    assert_eq!(stats.players, 3);
    assert_eq!(stats.process_load_percent(), 25.0);
}

#[tokio::test]
async fn test_rejected_password_registers_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/version"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let connector = HttpNodeConnector::new(Duration::from_secs(5)).unwrap();
    let registry = NodeRegistry::new(Arc::new(connector));

    assert_matches!(
        registry.add(node_for(&server, "local")).await,
        Err(BotError::PermissionDenied(_))
    );
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_duplicate_identifier_conflicts() {
    let registry = NodeRegistry::new(Arc::new(healthy_connector()));
    registry.add(node_config("main")).await.unwrap();

    assert_matches!(
        registry.add(node_config("main")).await,
        Err(BotError::Conflict(_))
    );
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_removing_a_node_tears_down_its_players() {
    let registry = NodeRegistry::new(Arc::new(healthy_connector()));
    let players = PlayerRegistry::new();
    registry.add(node_config("main")).await.unwrap();
    registry.add(node_config("backup")).await.unwrap();

    let guild = fixtures::guild();
    let mut player = MockGuildPlayer::new();
    player.expect_guild_id().return_const(guild);
    player.expect_teardown().times(1).returning(|| Ok(()));
    players.register(Arc::new(player));
    registry.assign_player("main", guild).unwrap();

    let stopped = remove_node(&registry, &players, "main").await.unwrap();

    assert_eq!(stopped, 1);
    assert!(players.is_empty());
    assert!(!registry.contains("main"));
    assert_eq!(registry.best_node().as_deref(), Some("backup"));
}

#[tokio::test]
async fn test_reconnect_leaves_disconnected_nodes_alone() {
    let mut connector = MockConnector::new();
    connector
        .expect_connect()
        .times(1)
        .returning(|_| Ok(Duration::from_millis(5)));
    connector.expect_disconnect().times(1).returning(|_| Ok(()));
    let registry = NodeRegistry::new(Arc::new(connector));
    registry.add(node_config("main")).await.unwrap();

    assert!(registry.disconnect("main").await.unwrap());
    assert!(!registry.reconnect("main").await.unwrap());
    assert!(!registry.get("main").unwrap().available);
}

#[tokio::test]
async fn test_panel_embed_reflects_registry() {
    let registry = NodeRegistry::new(Arc::new(healthy_connector()));
    registry.add(node_config("main")).await.unwrap();
    registry.add(node_config("backup")).await.unwrap();
    registry.disconnect("backup").await.unwrap();

    let embed = serde_json::to_value(nodes_embed(&registry.list(), None, 0)).unwrap();

    let fields = embed["fields"].as_array().unwrap();
    assert_eq!(fields[0]["name"], "Node backup - 🔴 Disconnected");
    assert_eq!(fields[1]["name"], "Node main - 🟢 Connected");
}
