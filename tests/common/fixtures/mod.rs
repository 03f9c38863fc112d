//! Test fixtures for the setlist bot
//! This module contains sample data and configurations used in tests

use serenity::model::id::{GuildId, UserId};
use setlist::nodes::{CpuStats, MemoryStats, NodeConfig, NodeStats};
use setlist::utils::config::BotConfig;

/// Sample guild ID for testing
pub const SAMPLE_GUILD_ID: u64 = 112233445566778899;

/// Sample maintainer ID for testing
pub const MAINTAINER_ID: u64 = 123456789;

/// Sample member without maintainer access
pub const MEMBER_ID: u64 = 987654321;

pub fn guild() -> GuildId {
    GuildId::new(SAMPLE_GUILD_ID)
}

pub fn maintainer() -> UserId {
    UserId::new(MAINTAINER_ID)
}

pub fn member() -> UserId {
    UserId::new(MEMBER_ID)
}

/// Bot config with three languages and one maintainer.
pub fn config() -> BotConfig {
    BotConfig {
        languages: vec!["EN".into(), "PL".into(), "DE".into()],
        bot_access_users: vec![MAINTAINER_ID],
        ..Default::default()
    }
}

pub fn node_config(identifier: &str) -> NodeConfig {
    NodeConfig {
        identifier: identifier.to_string(),
        host: "127.0.0.1".to_string(),
        port: 2333,
        password: "youshallnotpass".to_string(),
        secure: false,
    }
}

pub fn node_stats(players: u32) -> NodeStats {
    NodeStats {
        players,
        playing_players: players,
        uptime: 3_600_000,
        memory: MemoryStats {
            free: 256 * 1024 * 1024,
            used: 768 * 1024 * 1024,
            ..Default::default()
        },
        cpu: CpuStats {
            cores: 4,
            system_load: 0.4,
            lavalink_load: 0.05,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_data() {
        assert!(config().has_debug_access(MAINTAINER_ID));
        assert!(!config().has_debug_access(MEMBER_ID));
        assert!(node_config("main").validate().is_ok());
    }
}
