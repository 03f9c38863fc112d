//! Process-wide registry of audio nodes, passed to consumers through `Data`.
//!
//! A node becomes visible under its identifier only after its connection succeeded,
//! and it is removed from the map before its connection is torn down, so a panel
//! rendering concurrently never sees a half-added or half-removed node.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::connector::NodeConnector;
use super::{Node, NodeConfig, NodeSnapshot, NodeStats};
use crate::utils::error::{BotError, BotResult};

pub struct NodeRegistry {
    nodes: DashMap<String, Arc<Node>>,
    connector: Arc<dyn NodeConnector>,
}

impl NodeRegistry {
    pub fn new(connector: Arc<dyn NodeConnector>) -> Self {
        Self {
            nodes: DashMap::new(),
            connector,
        }
    }

    fn node(&self, identifier: &str) -> BotResult<Arc<Node>> {
        self.nodes
            .get(identifier)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BotError::NotFound(format!("Node `{identifier}` was not found")))
    }

    /// Validate, connect, then register. A failed connection registers nothing.
    pub async fn add(&self, config: NodeConfig) -> BotResult<NodeSnapshot> {
        config.validate()?;
        if self.nodes.contains_key(&config.identifier) {
            return Err(conflict(&config.identifier));
        }

        let latency = self.connector.connect(&config).await?;
        let node = Arc::new(Node::new(config));
        node.mark_connected(latency);

        // Another add for the same identifier may have finished while we were connecting.
        let inserted = match self.nodes.entry(node.identifier().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&node));
                true
            }
        };

        if !inserted {
            if let Err(e) = self.connector.disconnect(node.config()).await {
                warn!("Failed to drop duplicate connection to {}: {}", node.identifier(), e);
            }
            return Err(conflict(node.identifier()));
        }

        info!(
            "Registered node {} at {}",
            node.identifier(),
            node.config().address()
        );
        Ok(node.snapshot())
    }

    /// Deregister and disconnect a node. The guilds whose players were on it are
    /// returned so the caller can tear those players down.
    pub async fn remove(&self, identifier: &str) -> BotResult<Vec<GuildId>> {
        let (_, node) = self
            .nodes
            .remove(identifier)
            .ok_or_else(|| BotError::NotFound(format!("Node `{identifier}` was not found")))?;

        let orphaned = node.player_guilds();
        node.players.clear();

        if node.is_available() {
            node.mark_disconnected();
            if let Err(e) = self.connector.disconnect(node.config()).await {
                warn!("Node {} did not disconnect cleanly: {}", identifier, e);
            }
        }

        if orphaned.is_empty() {
            info!("Removed node {}", identifier);
        } else {
            warn!(
                "Removed node {} with {} active player(s)",
                identifier,
                orphaned.len()
            );
        }
        Ok(orphaned)
    }

    /// Returns whether a connection was opened; connecting a connected node is a no-op.
    pub async fn connect(&self, identifier: &str) -> BotResult<bool> {
        let node = self.node(identifier)?;
        // Only one connect or disconnect reaches the connector at a time.
        let Some(_transition) = node.begin_transition() else {
            debug!("Node {} is already changing state", identifier);
            return Ok(false);
        };
        if node.is_available() {
            debug!("Node {} is already connected", identifier);
            return Ok(false);
        }

        let latency = self.connector.connect(node.config()).await?;
        node.mark_connected(latency);
        info!("Connected node {}", identifier);
        Ok(true)
    }

    /// Returns whether a connection was closed; disconnecting twice is a no-op.
    /// A failed disconnect leaves the node marked connected.
    pub async fn disconnect(&self, identifier: &str) -> BotResult<bool> {
        let node = self.node(identifier)?;
        let Some(_transition) = node.begin_transition() else {
            debug!("Node {} is already changing state", identifier);
            return Ok(false);
        };
        if !node.is_available() {
            debug!("Node {} is already disconnected", identifier);
            return Ok(false);
        }

        self.connector.disconnect(node.config()).await?;
        node.mark_disconnected();
        info!("Disconnected node {}", identifier);
        Ok(true)
    }

    /// Drop and re-open the connection of a connected node. Disconnected nodes are
    /// left alone; use [`NodeRegistry::connect`] for those.
    pub async fn reconnect(&self, identifier: &str) -> BotResult<bool> {
        if !self.disconnect(identifier).await? {
            return Ok(false);
        }
        self.connect(identifier).await
    }

    pub fn get(&self, identifier: &str) -> Option<NodeSnapshot> {
        self.nodes.get(identifier).map(|node| node.snapshot())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.nodes.contains_key(identifier)
    }

    /// Snapshot of every node, ordered by identifier.
    pub fn list(&self) -> Vec<NodeSnapshot> {
        let mut nodes: Vec<NodeSnapshot> =
            self.nodes.iter().map(|entry| entry.value().snapshot()).collect();
        nodes.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Store the latest statistics pushed by a node.
    pub fn update_stats(&self, identifier: &str, stats: NodeStats) -> BotResult<()> {
        self.node(identifier)?.record_stats(stats);
        Ok(())
    }

    pub fn mark_unavailable(&self, identifier: &str) -> BotResult<()> {
        let node = self.node(identifier)?;
        if node.is_available() {
            warn!("Node {} is unreachable, marking it unavailable", identifier);
            node.mark_disconnected();
        }
        Ok(())
    }

    /// Poll every connected node for fresh statistics. Nodes that fail to answer are
    /// marked unavailable.
    pub async fn refresh_stats(&self) {
        let connected: Vec<Arc<Node>> = self
            .nodes
            .iter()
            .filter(|entry| entry.value().is_available())
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for node in connected {
            let started = std::time::Instant::now();
            match self.connector.fetch_stats(node.config()).await {
                Ok(stats) => {
                    node.record_latency(started.elapsed());
                    node.record_stats(stats);
                }
                Err(e) => {
                    warn!("Stats refresh failed for node {}: {}", node.identifier(), e);
                    node.mark_disconnected();
                }
            }
        }
    }

    /// Record that a guild's player now lives on `identifier`.
    pub fn assign_player(&self, identifier: &str, guild_id: GuildId) -> BotResult<()> {
        let node = self.node(identifier)?;
        if !node.is_available() {
            return Err(BotError::BackendUnavailable(format!(
                "Node `{identifier}` is not connected"
            )));
        }
        self.release_player(guild_id);
        node.players.insert(guild_id);
        Ok(())
    }

    /// Forget a guild's player on whichever node held it.
    pub fn release_player(&self, guild_id: GuildId) -> Option<String> {
        self.nodes.iter().find_map(|entry| {
            entry
                .value()
                .players
                .remove(&guild_id)
                .map(|_| entry.key().clone())
        })
    }

    pub fn player_guilds(&self, identifier: &str) -> BotResult<Vec<GuildId>> {
        Ok(self.node(identifier)?.player_guilds())
    }

    pub fn total_players(&self) -> usize {
        self.nodes.iter().map(|entry| entry.value().player_count()).sum()
    }

    /// The connected node carrying the fewest players.
    pub fn best_node(&self) -> Option<String> {
        self.nodes
            .iter()
            .filter(|entry| entry.value().is_available())
            .min_by_key(|entry| (entry.value().player_count(), entry.key().clone()))
            .map(|entry| entry.key().clone())
    }
}

fn conflict(identifier: &str) -> BotError {
    BotError::Conflict(format!("A node named `{identifier}` already exists"))
}
