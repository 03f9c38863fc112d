//! Common test utilities, fixtures, and mocks
//! This module contains shared functionality used across different test categories

pub mod fixtures;
pub mod mocks;

use std::path::PathBuf;
use std::sync::Arc;

use setlist::Data;
use setlist::nodes::connector::NodeConnector;
use setlist::nodes::registry::NodeRegistry;
use setlist::settings::store::SettingsStore;
use setlist::utils::config::BotConfig;

/// A settings store backed by an in-memory database.
pub fn memory_store(config: &BotConfig) -> SettingsStore {
    SettingsStore::open_in_memory(config.settings_defaults()).expect("in-memory store opens")
}

/// Shared handles wired the way the bot wires them, with a test connector.
pub fn test_data(config: BotConfig, connector: impl NodeConnector + 'static) -> Data {
    let store = memory_store(&config);
    let registry = Arc::new(NodeRegistry::new(Arc::new(connector)));
    Data::new(config, store, registry)
}

/// A unique path in the temp directory, removed if it already exists.
pub fn scratch_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "setlist-it-{}-{}",
        std::process::id(),
        name
    ));
    let _ = std::fs::remove_file(&path);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_paths_are_distinct() {
        assert_ne!(scratch_path("a.json"), scratch_path("b.json"));
        assert!(!scratch_path("fresh.json").exists());
    }
}
