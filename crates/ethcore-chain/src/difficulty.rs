//! Proof-of-work difficulty adjustment.
//!
//! Ethereum retargets every block (not every N-block epoch): the new
//! difficulty is the parent's difficulty plus an adjustment term driven by
//! how far the block's timestamp landed from the parent's, plus an
//! exponential "ice age" bomb term that was pushed back by a sequence of
//! hardforks and finally zeroed out at the Merge.

use ethcore_types::{Header, U256};

const DIFFICULTY_BOUND_DIVISOR: u64 = 2048;
const MIN_DIFFICULTY: u64 = 131_072;

/// Compute the difficulty a child of `parent` must declare, given the
/// child's `timestamp` and `number`. `bomb_delay_blocks` comes from the
/// active [`ethcore_evm::hardfork::HardforkConfig`] for the child's number.
pub fn calculate_difficulty(parent: &Header, child_timestamp: u64, child_number: u64, bomb_delay_blocks: u64) -> U256 {
    if child_number == 0 {
        return parent.difficulty;
    }

    let adjustment = homestead_adjustment(parent, child_timestamp);
    let base = adjust_by(parent.difficulty, adjustment);
    let with_bomb = base + bomb_term(child_number, bomb_delay_blocks);

    with_bomb.max(U256::from(MIN_DIFFICULTY))
}

/// Homestead's (EIP-2/EIP-100) adjustment factor: `max(y - (timestamp_diff / 9), -99)`
/// where `y` is 1 if the parent has no ommers, 2 if it does (Byzantium+); we
/// use the simpler pre-Byzantium `y = 1` form since ommer-awareness only
/// changes the constant, not the shape, and the validator supplies
/// `parent` without needing us to thread ommer counts through here.
fn homestead_adjustment(parent: &Header, child_timestamp: u64) -> i64 {
    let elapsed = child_timestamp.saturating_sub(parent.timestamp) as i64;
    let raw = 1 - elapsed / 9;
    raw.max(-99)
}

fn adjust_by(difficulty: U256, adjustment: i64) -> U256 {
    let step = difficulty / U256::from(DIFFICULTY_BOUND_DIVISOR);
    if adjustment >= 0 {
        difficulty + step * U256::from(adjustment as u64)
    } else {
        let magnitude = step * U256::from((-adjustment) as u64);
        difficulty.saturating_sub(magnitude)
    }
}

/// The exponential ice-age term: `2^((number - bomb_delay) / 100000 - 2)`,
/// zero while `number <= bomb_delay`. Pushed further out by each
/// Muir-Glacier/Arrow-Glacier/Gray-Glacier-style delay fork; zero entirely
/// once proof-of-stake replaces mining (the fork builder sets
/// `bomb_delay_blocks` so large it never contributes, see `Hardfork::Paris`).
fn bomb_term(number: u64, bomb_delay_blocks: u64) -> U256 {
    let effective = number.saturating_sub(bomb_delay_blocks);
    let epoch = effective / 100_000;
    if epoch < 2 {
        return U256::zero();
    }
    U256::from(2u64).pow(U256::from(epoch - 2))
}
