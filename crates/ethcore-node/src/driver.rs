//! Node runtime: wires the chain registry and block tree together and
//! drives the process lifecycle. Syncing blocks from peers and serving RPC
//! are both out of scope here (see the crate's Non-goals); this is the
//! single-process library surface a future sync/RPC layer would sit on top of.

use crate::config::NodeConfig;
use ethcore_chain::{BlockTree, ChainSpec};
use tracing::info;

/// A running node: its chain spec and the block tree rooted at that chain's genesis.
pub struct Node {
    config: NodeConfig,
    spec: ChainSpec,
    tree: BlockTree,
}

impl Node {
    /// Build a node for the configured chain, seeded with its genesis block.
    pub fn new(config: NodeConfig) -> Self {
        let spec = config.chain.spec();
        let tree = BlockTree::new(spec.genesis_header.clone());
        Self { config, spec, tree }
    }

    /// The chain this node is running.
    pub fn chain_spec(&self) -> &ChainSpec {
        &self.spec
    }

    /// The current best block.
    pub fn best_block(&self) -> (&ethcore_types::Header, ethcore_types::Hash) {
        self.tree.best_block()
    }

    /// Run the node until interrupted. With no sync source wired up yet,
    /// this just reports the genesis state and idles.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(chain = self.spec.name, chain_id = self.spec.chain_id, data_dir = %self.config.data_dir.display(), "node starting");
        let (header, hash) = self.best_block();
        info!(number = header.number, hash = %hex::encode(hash.as_bytes()), "best block");

        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        Ok(())
    }
}
