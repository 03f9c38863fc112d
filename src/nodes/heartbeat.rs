use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use super::registry::NodeRegistry;

/// Poll every connected node for statistics on a fixed interval until the returned
/// handle is aborted.
pub fn spawn(registry: Arc<NodeRegistry>, every: Duration) -> JoinHandle<()> {
    info!("Polling node statistics every {:?}", every);
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nodes were just connected.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            registry.refresh_stats().await;
            debug!(
                "Node heartbeat: {} node(s), {} player(s)",
                registry.len(),
                registry.total_players()
            );
        }
    })
}
