//! Transaction processing and block/header validation for the state
//! transition engine: the layer that turns a stream of blocks into state,
//! sitting on top of `ethcore-trie` (storage) and `ethcore-evm` (execution).

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod blocktree;
pub mod convert;
pub mod difficulty;
pub mod error;
pub mod registry;
pub mod reward;
pub mod rlp;
pub mod tx_processor;
pub mod validator;

pub use blocktree::{BlockTree, Orphan};
pub use error::{BlockError, TxError};
pub use registry::{ChainName, ChainSpec, ForkActivation, GenesisAccount};
pub use reward::{block_rewards, RewardPayment, RewardRecipient};
pub use tx_processor::{intrinsic_gas, preflight, process_transaction, AccountLedger, ProcessedTransaction};
pub use validator::{validate_header, validate_ommers, verify_post_execution, ExecutionSummary, NoopSealVerifier, SealVerifier};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
