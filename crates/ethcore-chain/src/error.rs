//! Error taxonomy for block and transaction processing.
//!
//! `BlockError` and `TxError` are both "protocol-invalid" classes: the
//! offending block/transaction is rejected, the chain state is unaffected,
//! and the caller decides what to do next (drop, hold as orphan, etc).
//! `TrieError`/`VmError` bubbling up from `ethcore-trie`/`ethcore-evm` are
//! treated as fatal and propagated with `?` rather than caught here.

use ethcore_types::Hash;
use thiserror::Error;

/// A header or body fails one of the block-level invariants.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("unknown parent {0:?}")]
    UnknownParent(Hash),

    #[error("block number {got} is not parent number {parent} + 1")]
    NonSequentialNumber { parent: u64, got: u64 },

    #[error("gas limit {got} outside parent {parent} +/- 1/1024 drift (bounds [{min}, {max}])")]
    GasLimitDrift {
        parent: u64,
        got: u64,
        min: u64,
        max: u64,
    },

    #[error("gas limit {0} below the protocol minimum of 5000")]
    GasLimitTooLow(u64),

    #[error("timestamp {got} does not exceed parent timestamp {parent}")]
    TimestampNotIncreasing { parent: u64, got: u64 },

    #[error("header difficulty {got} does not match computed {expected}")]
    DifficultyMismatch { expected: String, got: String },

    #[error("seal verification failed: {0}")]
    InvalidSeal(String),

    #[error("block has {0} ommers, more than the maximum of 2")]
    TooManyOmmers(usize),

    #[error("ommer {0:?} is not a valid ancestor within 6 generations")]
    InvalidOmmerAncestry(Hash),

    #[error("ommer {0:?} was already included by an earlier block")]
    DuplicateOmmer(Hash),

    #[error("state root mismatch: header says {expected:?}, computed {got:?}")]
    StateRootMismatch { expected: Hash, got: Hash },

    #[error("transactions root mismatch: header says {expected:?}, computed {got:?}")]
    TransactionsRootMismatch { expected: Hash, got: Hash },

    #[error("receipts root mismatch: header says {expected:?}, computed {got:?}")]
    ReceiptsRootMismatch { expected: Hash, got: Hash },

    #[error("gas used mismatch: header says {expected}, computed {got}")]
    GasUsedMismatch { expected: u64, got: u64 },

    #[error("logs bloom mismatch")]
    LogsBloomMismatch,

    #[error("transaction {index} rejected: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: TxError,
    },
}

/// A transaction fails one of the preflight checks in the Yellow Paper's
/// `Π`/intrinsic validity rules. Raised before any execution happens, so no
/// state has been mutated yet.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("signature recovery failed")]
    InvalidSignature,

    #[error("signature s-value {0:?} is not in the lower half of the curve order (EIP-2)")]
    SignatureNotLowS(String),

    #[error("nonce mismatch: account has {account}, transaction has {tx}")]
    NonceMismatch { account: u64, tx: u64 },

    #[error("sender balance {balance} insufficient for gas_limit*gas_price + value = {required}")]
    InsufficientBalance { balance: String, required: String },

    #[error("gas limit {gas_limit} exceeds block remaining gas {remaining}")]
    GasLimitExceedsBlock { gas_limit: u64, remaining: u64 },

    #[error("gas limit {gas_limit} below intrinsic gas {intrinsic}")]
    IntrinsicGasNotMet { gas_limit: u64, intrinsic: u64 },

    #[error("transaction type {0} is not active under this hardfork")]
    TypeNotActive(u8),

    #[error("max_fee_per_gas {max_fee} is below the block's base fee {base_fee}")]
    MaxFeeBelowBaseFee { max_fee: String, base_fee: String },
}
