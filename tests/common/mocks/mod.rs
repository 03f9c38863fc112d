//! Mock implementations for external dependencies
//! This module contains mock objects used for testing

use async_trait::async_trait;
use mockall::mock;
use serde_json::Value;
use serenity::model::id::{GuildId, UserId};
use std::time::Duration;

use setlist::nodes::connector::NodeConnector;
use setlist::nodes::{NodeConfig, NodeStats};
use setlist::players::Player;
use setlist::utils::error::BotResult;

mock! {
    /// Audio node connection double
    pub Connector {}

    #[async_trait]
    impl NodeConnector for Connector {
        async fn connect(&self, config: &NodeConfig) -> BotResult<Duration>;
        async fn disconnect(&self, config: &NodeConfig) -> BotResult<()>;
        async fn fetch_stats(&self, config: &NodeConfig) -> BotResult<NodeStats>;
    }
}

mock! {
    /// Live player double
    pub GuildPlayer {}

    #[async_trait]
    impl Player for GuildPlayer {
        fn guild_id(&self) -> GuildId;
        async fn set_volume(&self, volume: u8, actor: UserId) -> BotResult<()>;
        fn set_allow_duplicates(&self, allow: bool);
        async fn delete_controller(&self) -> BotResult<()>;
        fn is_active(&self) -> bool;
        fn data(&self) -> Value;
        async fn teardown(&self) -> BotResult<()>;
    }
}

/// A connector whose nodes always answer.
pub fn healthy_connector() -> MockConnector {
    let mut mock = MockConnector::new();
    mock.expect_connect()
        .returning(|_| Ok(Duration::from_millis(12)));
    mock.expect_disconnect().returning(|_| Ok(()));
    mock
}

/// A player for `guild` that accepts any call.
pub fn idle_player(guild: GuildId, active: bool) -> MockGuildPlayer {
    let mut mock = MockGuildPlayer::new();
    mock.expect_guild_id().return_const(guild);
    mock.expect_is_active().return_const(active);
    mock.expect_data()
        .returning(move || serde_json::json!({ "guild_id": guild.get() }));
    mock.expect_teardown().returning(|| Ok(()));
    mock
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::fixtures::node_config;

    #[tokio::test]
    async fn test_healthy_connector_answers() {
        let connector = healthy_connector();

        let latency = connector.connect(&node_config("main")).await.unwrap();
        assert_eq!(latency, Duration::from_millis(12));
    }
}
