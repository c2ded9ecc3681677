//! Shared error building blocks.
//!
//! The per-failure-class taxonomy (`BlockError`, `TxError`, `VmError`,
//! `TrieError`) lives in the crate that owns that failure class
//! (`ethcore-chain`, `ethcore-evm`, `ethcore-trie` respectively); this
//! module only holds pieces genuinely common to more than one of them.

use thiserror::Error;

/// Failure to decode an RLP byte string into a domain type.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("unexpected RLP shape: {0}")]
    UnexpectedShape(String),

    #[error("trailing bytes after RLP item")]
    TrailingBytes,

    #[error("integer overflow decoding field {0}")]
    IntegerOverflow(&'static str),
}
