//! Named-chain registry.
//!
//! A [`ChainSpec`] is a declarative record of everything that makes a chain
//! distinct from another running the same client: its id, its genesis block,
//! its initial account balances, and the block number each hardfork
//! activates at. None of this is computed; it's read off by the validator
//! and transaction processor as a lookup, the way a config file would be.

use ethcore_evm::hardfork::{Hardfork, HardforkConfig};
use ethcore_types::{Address, Bloom, Hash, Header, U256};

/// A chain identified by name, as accepted by `--chain`/`ETHCORE_CHAIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainName {
    Mainnet,
    Sepolia,
    Dev,
}

impl ChainName {
    /// Parse a chain name from a config string. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Some(Self::Mainnet),
            "sepolia" => Some(Self::Sepolia),
            "dev" | "dev-net" | "devnet" => Some(Self::Dev),
            _ => None,
        }
    }

    /// The [`ChainSpec`] for this chain.
    pub fn spec(&self) -> ChainSpec {
        match self {
            Self::Mainnet => ChainSpec::mainnet(),
            Self::Sepolia => ChainSpec::sepolia(),
            Self::Dev => ChainSpec::dev(),
        }
    }
}

/// A block number at which a hardfork activates. Chains that launched after
/// a given fork activate it at genesis (block 0).
#[derive(Debug, Clone, Copy)]
pub struct ForkActivation {
    pub fork: Hardfork,
    pub block: u64,
}

/// An account pre-funded in the genesis state, before any transaction has run.
#[derive(Debug, Clone)]
pub struct GenesisAccount {
    pub address: Address,
    pub balance: U256,
}

/// A fully-specified chain: identity, genesis state, and fork schedule.
#[derive(Debug, Clone)]
pub struct ChainSpec {
    pub name: &'static str,
    pub chain_id: u64,
    pub network_id: u64,
    pub genesis_header: Header,
    pub genesis_accounts: Vec<GenesisAccount>,
    /// Fork activations, in ascending block-number order.
    pub fork_schedule: Vec<ForkActivation>,
}

impl ChainSpec {
    /// The [`HardforkConfig`] active at `block_number`. The last schedule
    /// entry at or before `block_number` wins; a block before the chain's
    /// earliest entry runs under that earliest fork (chains don't launch
    /// pre-Frontier).
    pub fn hardfork_at(&self, block_number: u64) -> HardforkConfig {
        let fork = self
            .fork_schedule
            .iter()
            .filter(|activation| activation.block <= block_number)
            .map(|activation| activation.fork)
            .max()
            .unwrap_or(self.fork_schedule[0].fork);
        HardforkConfig::for_fork(fork)
    }

    fn empty_genesis_header(chain_id: u64, extra_data: Vec<u8>, gas_limit: u64, difficulty: U256) -> Header {
        let empty_root = Hash::from_slice(&ethcore_crypto::hashing::keccak256(&[0x80]));
        let empty_list_hash = Hash::from_slice(&ethcore_crypto::hashing::keccak256(&[0xc0]));
        Header {
            parent_hash: Hash::zero(),
            ommers_hash: empty_list_hash,
            beneficiary: Address::zero(),
            state_root: empty_root,
            transactions_root: empty_root,
            receipts_root: empty_root,
            logs_bloom: Bloom::default(),
            difficulty,
            number: 0,
            gas_limit,
            gas_used: 0,
            timestamp: 0,
            extra_data,
            mix_hash: Hash::zero(),
            nonce: 0,
            base_fee_per_gas: None,
        }
        .with_chain_marker(chain_id)
    }

    pub fn mainnet() -> Self {
        Self {
            name: "mainnet",
            chain_id: 1,
            network_id: 1,
            genesis_header: Self::empty_genesis_header(1, b"mainnet".to_vec(), 5_000, U256::from(0x400000u64)),
            genesis_accounts: Vec::new(),
            fork_schedule: vec![
                ForkActivation { fork: Hardfork::Frontier, block: 0 },
                ForkActivation { fork: Hardfork::Homestead, block: 1_150_000 },
                ForkActivation { fork: Hardfork::TangerineWhistle, block: 2_463_000 },
                ForkActivation { fork: Hardfork::SpuriousDragon, block: 2_675_000 },
                ForkActivation { fork: Hardfork::Byzantium, block: 4_370_000 },
                ForkActivation { fork: Hardfork::Constantinople, block: 7_280_000 },
                ForkActivation { fork: Hardfork::Petersburg, block: 7_280_000 },
                ForkActivation { fork: Hardfork::Istanbul, block: 9_069_000 },
                ForkActivation { fork: Hardfork::Berlin, block: 12_244_000 },
                ForkActivation { fork: Hardfork::London, block: 12_965_000 },
                ForkActivation { fork: Hardfork::Paris, block: 15_537_394 },
                ForkActivation { fork: Hardfork::Shanghai, block: 17_034_870 },
                ForkActivation { fork: Hardfork::Cancun, block: 19_426_587 },
            ],
        }
    }

    pub fn sepolia() -> Self {
        Self {
            name: "sepolia",
            chain_id: 11_155_111,
            network_id: 11_155_111,
            genesis_header: Self::empty_genesis_header(11_155_111, b"sepolia".to_vec(), 30_000_000, U256::from(0x20000u64)),
            genesis_accounts: Vec::new(),
            fork_schedule: vec![
                // Sepolia launched post-Merge-preparation with most forks already active.
                ForkActivation { fork: Hardfork::London, block: 0 },
                ForkActivation { fork: Hardfork::Paris, block: 1_735_371 },
                ForkActivation { fork: Hardfork::Shanghai, block: 2_990_908 },
                ForkActivation { fork: Hardfork::Cancun, block: 5_187_023 },
            ],
        }
    }

    /// A local development chain: all forks active from genesis, low difficulty,
    /// a handful of pre-funded accounts for test fixtures.
    pub fn dev() -> Self {
        let genesis_accounts = (0u8..10)
            .map(|i| GenesisAccount {
                address: Address::from_low_u64_be(u64::from(i) + 1),
                balance: U256::from(1_000u64) * U256::from(10).pow(U256::from(18)),
            })
            .collect();

        Self {
            name: "dev",
            chain_id: 1_337,
            network_id: 1_337,
            genesis_header: Self::empty_genesis_header(1_337, b"dev".to_vec(), 30_000_000, U256::one()),
            genesis_accounts,
            fork_schedule: vec![ForkActivation { fork: Hardfork::Cancun, block: 0 }],
        }
    }
}

trait HeaderExt {
    fn with_chain_marker(self, chain_id: u64) -> Header;
}

impl HeaderExt for Header {
    /// Folds the chain id into `extra_data` so two chains sharing every other
    /// genesis parameter still produce distinct genesis hashes.
    fn with_chain_marker(mut self, chain_id: u64) -> Header {
        self.extra_data.extend_from_slice(&chain_id.to_be_bytes());
        self
    }
}
