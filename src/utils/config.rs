//! The bot-wide settings file (`settings.json` unless `SETLIST_SETTINGS` says otherwise).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::nodes::NodeConfig;
use crate::settings::SettingsDefaults;
use crate::settings::embed::EmbedTemplateSet;

use super::error::{BotError, BotResult};

pub const SETTINGS_ENV: &str = "SETLIST_SETTINGS";
pub const DEFAULT_SETTINGS_PATH: &str = "settings.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    pub bot_prefix: String,
    pub embed_color: u32,
    /// Image shown on the idle controller.
    pub default_embed_image: String,
    pub version: String,
    pub default_lang: String,
    pub languages: Vec<String>,
    /// Users allowed into the debug panel.
    pub bot_access_users: Vec<u64>,
    pub max_queue: u32,
    pub database_path: PathBuf,
    pub session_file: PathBuf,
    /// Nodes connected at startup.
    pub nodes: Vec<NodeConfig>,
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
    /// Per-command cooldown overrides keyed by command name.
    pub cooldowns: HashMap<String, humantime_serde::Serde<Duration>>,
    #[serde(with = "humantime_serde")]
    pub panel_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub embed_builder_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub stats_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub node_timeout: Duration,
    pub controller: EmbedTemplateSet,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_prefix: "?".to_string(),
            embed_color: 0xb3b3b3,
            default_embed_image: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_lang: "EN".to_string(),
            languages: vec!["EN".to_string()],
            bot_access_users: Vec::new(),
            max_queue: 1000,
            database_path: PathBuf::from("settings.db"),
            session_file: PathBuf::from("last-session.json"),
            nodes: Vec::new(),
            cooldown: Duration::from_secs(3),
            cooldowns: HashMap::new(),
            panel_timeout: Duration::from_secs(180),
            embed_builder_timeout: Duration::from_secs(300),
            stats_interval: Duration::from_secs(60),
            node_timeout: Duration::from_secs(10),
            controller: EmbedTemplateSet::default(),
        }
    }
}

impl BotConfig {
    /// Read the config file named by `SETLIST_SETTINGS`, falling back to `settings.json`.
    pub fn from_env() -> BotResult<Self> {
        let path = std::env::var(SETTINGS_ENV).unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.into());
        Self::load(path)
    }

    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> BotResult<Self> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            BotError::Validation(format!("{} is not a valid config file: {}", path.display(), e))
        })?;
        config.validate()?;

        info!(
            "Loaded config from {} ({} node(s), {} language(s))",
            path.display(),
            config.nodes.len(),
            config.languages.len()
        );
        Ok(config)
    }

    fn validate(&self) -> BotResult<()> {
        if !self.languages.contains(&self.default_lang) {
            return Err(BotError::Validation(format!(
                "default_lang `{}` is not one of the configured languages",
                self.default_lang
            )));
        }
        if self.embed_color > 0xFFFFFF {
            return Err(BotError::Validation(format!(
                "embed_color {:#x} is not an RGB color",
                self.embed_color
            )));
        }
        for node in &self.nodes {
            node.validate()?;
        }
        Ok(())
    }

    pub fn settings_defaults(&self) -> SettingsDefaults {
        SettingsDefaults {
            prefix: self.bot_prefix.clone(),
            lang: self.default_lang.clone(),
            languages: self.languages.clone(),
            controller: self.controller.clone(),
        }
    }

    pub fn cooldown_overrides(&self) -> HashMap<String, Duration> {
        self.cooldowns
            .iter()
            .map(|(command, duration)| (command.clone(), **duration))
            .collect()
    }

    pub fn has_debug_access(&self, user_id: u64) -> bool {
        self.bot_access_users.contains(&user_id)
    }
}
