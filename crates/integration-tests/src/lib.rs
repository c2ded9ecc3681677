//! # Integration Tests Crate
//!
//! Cross-crate tests that exercise the EVM service and the state trie
//! together, closer to how `ethcore-chain` actually drives them than
//! either crate's own unit tests can.

pub mod evm_trie_flow;
