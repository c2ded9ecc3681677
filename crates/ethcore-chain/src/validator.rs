//! Block and header validation.
//!
//! Split into the checks that can run before any transaction executes
//! (parent linkage, gas limit drift, timestamp, difficulty, the PoW seal,
//! ommers) and the checks that can only run after (state/transactions/
//! receipts roots, cumulative gas used, the logs bloom) — the processor
//! drives both halves around the actual execution step.

use crate::blocktree::BlockTree;
use crate::difficulty::calculate_difficulty;
use crate::error::BlockError;
use ethcore_evm::hardfork::HardforkConfig;
use ethcore_types::{Block, Bloom, Hash, Header};

/// Gas limit may drift from the parent's by at most 1/1024 per block.
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;
/// Protocol-minimum gas limit, below which a block is always invalid.
pub const MIN_GAS_LIMIT: u64 = 5_000;
/// An ommer must be an ancestor of the including block within this many generations.
pub const MAX_OMMER_DEPTH: u64 = 6;
/// At most this many ommers per block.
pub const MAX_OMMERS: usize = 2;

/// Verifies a block's proof-of-work seal. A pure-PoW chain checks the mix
/// hash/nonce against the Ethash target; a post-Merge chain (or a test
/// harness) can supply a verifier that simply accepts everything once
/// `HardforkConfig::proof_of_stake` is set, since sealing moves to the
/// consensus layer at that point.
pub trait SealVerifier {
    fn verify_seal(&self, header: &Header, difficulty: ethcore_types::U256) -> Result<(), String>;
}

/// Accepts any header unconditionally. Used once `HardforkConfig::proof_of_stake`
/// is true, where seal validity is the beacon chain's concern, not this engine's.
pub struct NoopSealVerifier;

impl SealVerifier for NoopSealVerifier {
    fn verify_seal(&self, _header: &Header, _difficulty: ethcore_types::U256) -> Result<(), String> {
        Ok(())
    }
}

/// Validate everything about a header that doesn't require executing its
/// transactions: parent linkage, gas limit drift, timestamp, difficulty, and the seal.
pub fn validate_header(
    header: &Header,
    parent: &Header,
    config: &HardforkConfig,
    sealer: &dyn SealVerifier,
) -> Result<(), BlockError> {
    let parent_hash = crate::rlp::hash_header(parent);
    if header.parent_hash != parent_hash {
        return Err(BlockError::UnknownParent(header.parent_hash));
    }
    if header.number != parent.number + 1 {
        return Err(BlockError::NonSequentialNumber { parent: parent.number, got: header.number });
    }
    if header.timestamp <= parent.timestamp {
        return Err(BlockError::TimestampNotIncreasing { parent: parent.timestamp, got: header.timestamp });
    }
    if header.gas_limit < MIN_GAS_LIMIT {
        return Err(BlockError::GasLimitTooLow(header.gas_limit));
    }

    let max_drift = parent.gas_limit / GAS_LIMIT_BOUND_DIVISOR;
    let min = parent.gas_limit.saturating_sub(max_drift);
    let max = parent.gas_limit.saturating_add(max_drift);
    if header.gas_limit < min || header.gas_limit > max {
        return Err(BlockError::GasLimitDrift { parent: parent.gas_limit, got: header.gas_limit, min, max });
    }

    if !config.proof_of_stake {
        let expected = calculate_difficulty(parent, header.timestamp, header.number, config.bomb_delay_blocks);
        if header.difficulty != expected {
            return Err(BlockError::DifficultyMismatch {
                expected: expected.to_string(),
                got: header.difficulty.to_string(),
            });
        }
        sealer
            .verify_seal(header, header.difficulty)
            .map_err(BlockError::InvalidSeal)?;
    }

    Ok(())
}

/// Validate a block's ommers against the tree they'd be inserted into:
/// count, ancestry depth, and no duplicate/self inclusion.
pub fn validate_ommers(block: &Block, tree: &BlockTree) -> Result<(), BlockError> {
    if block.ommers.len() > MAX_OMMERS {
        return Err(BlockError::TooManyOmmers(block.ommers.len()));
    }

    let mut seen = std::collections::HashSet::new();
    for ommer in &block.ommers {
        let ommer_hash = crate::rlp::hash_header(ommer);
        if !seen.insert(ommer_hash) {
            return Err(BlockError::DuplicateOmmer(ommer_hash));
        }

        let depth = block.header.number.saturating_sub(ommer.number);
        let is_known_ancestor = tree.get(&ommer_hash).is_some() || tree.is_canonical(&ommer_hash);
        let within_depth = depth >= 1 && depth <= MAX_OMMER_DEPTH;
        if !within_depth || !is_known_ancestor {
            return Err(BlockError::InvalidOmmerAncestry(ommer_hash));
        }
    }

    Ok(())
}

/// Outcome of executing a block's transactions, as computed by the caller
/// (the tx processor), to be checked against the header's commitments.
pub struct ExecutionSummary {
    pub state_root: Hash,
    pub transactions_root: Hash,
    pub receipts_root: Hash,
    pub gas_used: u64,
    pub logs_bloom: Bloom,
}

/// Verify that a header's commitments match what actually happened when its
/// transactions were executed.
pub fn verify_post_execution(header: &Header, summary: &ExecutionSummary) -> Result<(), BlockError> {
    if header.state_root != summary.state_root {
        return Err(BlockError::StateRootMismatch { expected: header.state_root, got: summary.state_root });
    }
    if header.transactions_root != summary.transactions_root {
        return Err(BlockError::TransactionsRootMismatch {
            expected: header.transactions_root,
            got: summary.transactions_root,
        });
    }
    if header.receipts_root != summary.receipts_root {
        return Err(BlockError::ReceiptsRootMismatch { expected: header.receipts_root, got: summary.receipts_root });
    }
    if header.gas_used != summary.gas_used {
        return Err(BlockError::GasUsedMismatch { expected: header.gas_used, got: summary.gas_used });
    }
    if header.logs_bloom != summary.logs_bloom {
        return Err(BlockError::LogsBloomMismatch);
    }
    Ok(())
}
