//! Node binary entry point: loads configuration, starts telemetry, and runs the node.

use anyhow::Result;
use ethcore_node::{Node, NodeConfig};
use ethcore_telemetry::{init_tracing, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    let _guard = init_tracing(&telemetry)?;

    let config = NodeConfig::from_env();
    tracing::info!(chain = ?config.chain, "ethcore-node starting");

    let node = Node::new(config);
    node.run().await?;

    Ok(())
}
