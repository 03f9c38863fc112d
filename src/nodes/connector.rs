//! How the registry talks to an audio node.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{NodeConfig, NodeStats};
use crate::utils::error::{BotError, BotResult};

/// Connection operations against one audio node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeConnector: Send + Sync {
    /// Open a connection and return the round trip it took.
    async fn connect(&self, config: &NodeConfig) -> BotResult<Duration>;

    async fn disconnect(&self, config: &NodeConfig) -> BotResult<()>;

    async fn fetch_stats(&self, config: &NodeConfig) -> BotResult<NodeStats>;
}

/// Talks to the node's REST API.
#[derive(Clone)]
pub struct HttpNodeConnector {
    client: Client,
}

impl HttpNodeConnector {
    pub fn new(timeout: Duration) -> BotResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn get(&self, config: &NodeConfig, path: &str) -> BotResult<reqwest::Response> {
        let url = format!("{}{}", config.base_url(), path);
        debug!("GET {} on node {}", path, config.identifier);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, &config.password)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(BotError::PermissionDenied(format!(
                    "Node `{}` rejected the password",
                    config.identifier
                )))
            }
            status => Err(BotError::BackendUnavailable(format!(
                "Node `{}` answered {} for {}",
                config.identifier, status, path
            ))),
        }
    }
}

#[async_trait]
impl NodeConnector for HttpNodeConnector {
    async fn connect(&self, config: &NodeConfig) -> BotResult<Duration> {
        let started = Instant::now();
        let response = self.get(config, "/version").await?;
        let latency = started.elapsed();

        let version = response.text().await.unwrap_or_default();
        debug!(
            "Connected to node {} (version {}) in {:?}",
            config.identifier,
            version.trim(),
            latency
        );
        Ok(latency)
    }

    async fn disconnect(&self, config: &NodeConfig) -> BotResult<()> {
        // REST sessions hold no server-side state to release.
        debug!("Disconnected from node {}", config.identifier);
        Ok(())
    }

    async fn fetch_stats(&self, config: &NodeConfig) -> BotResult<NodeStats> {
        let response = self.get(config, "/v4/stats").await?;
        response.json::<NodeStats>().await.map_err(|e| {
            warn!("Node {} sent unreadable stats: {}", config.identifier, e);
            BotError::BackendUnavailable(format!(
                "Node `{}` sent unreadable stats",
                config.identifier
            ))
        })
    }
}
