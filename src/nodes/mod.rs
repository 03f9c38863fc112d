//! Audio backend nodes: their configuration, the statistics they report and the
//! registry that owns the live connections.

pub mod connector;
pub mod heartbeat;
pub mod registry;

use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use serenity::model::id::GuildId;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::utils::error::{BotError, BotResult};

/// Connection details of one audio node.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub identifier: String,
    pub host: String,
    pub port: u16,
    pub password: String,
    #[serde(default)]
    pub secure: bool,
}

// The password stays out of logs.
impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("identifier", &self.identifier)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl NodeConfig {
    /// Build a config from the raw text of the "Add node" form.
    pub fn from_form(
        host: &str,
        port: &str,
        password: &str,
        secure: &str,
        identifier: &str,
    ) -> BotResult<Self> {
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| BotError::Validation(format!("`{}` is not a valid port", port.trim())))?;

        let config = Self {
            identifier: identifier.trim().to_string(),
            host: host.trim().to_string(),
            port,
            password: password.to_string(),
            secure: secure.trim().eq_ignore_ascii_case("true"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BotResult<()> {
        if self.identifier.is_empty() || self.identifier.len() > 100 {
            return Err(BotError::Validation(
                "The node identifier must be between 1 and 100 characters".into(),
            ));
        }
        if self.host.is_empty() || self.host.contains(char::is_whitespace) || self.host.contains("://")
        {
            return Err(BotError::Validation(format!(
                "`{}` is not a valid host, use a bare hostname or IP address",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(BotError::Validation("The port must be between 1 and 65535".into()));
        }
        if self.password.is_empty() {
            return Err(BotError::Validation("The node password cannot be empty".into()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub free: u64,
    pub used: u64,
    #[serde(default)]
    pub allocated: u64,
    #[serde(default)]
    pub reservable: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    #[serde(default)]
    pub cores: u32,
    #[serde(default)]
    pub system_load: f64,
    /// Fraction of the CPU used by the node process, 0.0 to 1.0.
    #[serde(default)]
    pub lavalink_load: f64,
}

/// Load statistics as last reported by a node.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    pub players: u32,
    #[serde(default)]
    pub playing_players: u32,
    /// Milliseconds since the node started.
    pub uptime: u64,
    pub memory: MemoryStats,
    pub cpu: CpuStats,
}

impl NodeStats {
    pub fn memory_total(&self) -> u64 {
        self.memory.used + self.memory.free
    }

    pub fn free_memory_percent(&self) -> f64 {
        match self.memory_total() {
            0 => 0.0,
            total => self.memory.free as f64 / total as f64 * 100.0,
        }
    }

    pub fn process_load_percent(&self) -> f64 {
        self.cpu.lavalink_load * 100.0
    }

    pub fn uptime(&self) -> Duration {
        Duration::from_millis(self.uptime)
    }
}

#[derive(Debug, Default)]
struct NodeStatus {
    stats: Option<NodeStats>,
    latency: Option<Duration>,
}

/// One registered node. Only the registry holds these; everything else works with
/// [`NodeSnapshot`]s.
#[derive(Debug)]
pub struct Node {
    config: NodeConfig,
    available: AtomicBool,
    /// Set while a connect or disconnect is in flight.
    transitioning: AtomicBool,
    status: RwLock<NodeStatus>,
    players: DashSet<GuildId>,
}

/// Releases the node's transition claim when dropped.
struct Transition<'a>(&'a Node);

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        self.0.transitioning.store(false, Ordering::Release);
    }
}

impl Node {
    fn new(config: NodeConfig) -> Self {
        Self {
            config,
            available: AtomicBool::new(false),
            transitioning: AtomicBool::new(false),
            status: RwLock::new(NodeStatus::default()),
            players: DashSet::new(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn identifier(&self) -> &str {
        &self.config.identifier
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Claim the node for one state change; `None` while another is already running.
    fn begin_transition(&self) -> Option<Transition<'_>> {
        self.transitioning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Transition(self))
    }

    fn mark_connected(&self, latency: Duration) {
        if let Ok(mut status) = self.status.write() {
            status.latency = Some(latency);
        }
        self.available.store(true, Ordering::Release);
    }

    fn mark_disconnected(&self) {
        self.available.store(false, Ordering::Release);
    }

    fn record_stats(&self, stats: NodeStats) {
        if let Ok(mut status) = self.status.write() {
            status.stats = Some(stats);
        }
    }

    fn record_latency(&self, latency: Duration) {
        if let Ok(mut status) = self.status.write() {
            status.latency = Some(latency);
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    fn player_guilds(&self) -> Vec<GuildId> {
        let mut guilds: Vec<GuildId> = self.players.iter().map(|g| *g).collect();
        guilds.sort();
        guilds
    }

    fn snapshot(&self) -> NodeSnapshot {
        let (stats, latency) = self
            .status
            .read()
            .map(|status| (status.stats.clone(), status.latency))
            .unwrap_or_default();

        NodeSnapshot {
            identifier: self.config.identifier.clone(),
            host: self.config.host.clone(),
            port: self.config.port,
            secure: self.config.secure,
            available: self.is_available(),
            stats,
            latency,
            player_count: self.player_count(),
        }
    }
}

/// A point-in-time copy of a node for display. Re-fetch to see changes.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub identifier: String,
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub available: bool,
    pub stats: Option<NodeStats>,
    pub latency: Option<Duration>,
    pub player_count: usize,
}

impl NodeSnapshot {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn latency_ms(&self) -> f64 {
        if !self.available {
            return 0.0;
        }
        self.latency.map(|l| l.as_secs_f64() * 1000.0).unwrap_or(0.0)
    }
}
