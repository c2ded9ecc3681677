//! Node configuration.

use std::path::PathBuf;

use ethcore_chain::registry::ChainName;

/// Top-level node configuration: which chain to run and where to persist state.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Named chain to load genesis and hardfork schedule from.
    pub chain: ChainName,

    /// Data directory for the RocksDB-backed key/value store.
    pub data_dir: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain: ChainName::Mainnet,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl NodeConfig {
    /// Build configuration from environment variables.
    ///
    /// - `ETHCORE_CHAIN`: named chain (`mainnet`, `sepolia`, `dev`). Default `mainnet`.
    /// - `ETHCORE_DATA_DIR`: data directory. Default `./data`.
    pub fn from_env() -> Self {
        let chain = std::env::var("ETHCORE_CHAIN")
            .ok()
            .and_then(|s| ChainName::parse(&s))
            .unwrap_or(ChainName::Mainnet);
        let data_dir = std::env::var("ETHCORE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        Self { chain, data_dir }
    }
}
