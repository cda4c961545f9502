//! `gossamer broadcast`

use anyhow::{Context, Result};
use gossamer_broadcast::{BroadcastState, GossipConfig, install};
use gossamer_config::GossamerConfig;
use gossamer_node::Node;
use tracing::info;

pub async fn run(config: &GossamerConfig) -> Result<()> {
    let gossip = GossipConfig {
        interval: config.gossip.interval(),
        track_neighbors: config.gossip.track_neighbors,
        full_sync_every: config.gossip.full_sync_every,
    };

    let mut node = Node::new(BroadcastState::new(gossip));
    install(&mut node).context("Failed to register broadcast handlers")?;

    info!(?gossip, tick = ?config.runtime.tick(), "starting broadcast node");
    super::serve_stdio(node, config.runtime.tick()).await
}
