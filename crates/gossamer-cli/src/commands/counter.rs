//! `gossamer counter`

use anyhow::{Context, Result};
use gossamer_config::GossamerConfig;
use gossamer_counter::{CounterConfig, CounterState, install};
use gossamer_node::Node;
use tracing::info;

pub async fn run(config: &GossamerConfig) -> Result<()> {
    let counter = CounterConfig {
        service: config.counter.service.as_str().into(),
        request_timeout: config.counter.request_timeout(),
    };

    info!(service = %counter.service, timeout = ?counter.request_timeout, "starting counter node");
    let mut node = Node::new(CounterState::new(counter));
    install(&mut node).context("Failed to register counter handlers")?;

    super::serve_stdio(node, config.runtime.tick()).await
}
