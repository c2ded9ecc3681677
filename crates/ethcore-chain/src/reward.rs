//! Block reward payment.
//!
//! Unlike Bitcoin's halving schedule, Ethereum's block reward only changes at
//! fork boundaries and was fixed at zero once proof-of-stake took over
//! (`HardforkConfig::block_reward` already encodes this per fork). What's
//! left to compute here is the ommer-inclusion side payments, which scale
//! with how many generations back each ommer sits.

use ethcore_evm::hardfork::HardforkConfig;
use ethcore_types::{Header, U256};

/// One reward owed to a beneficiary address as a result of sealing a block.
#[derive(Debug, Clone, Copy)]
pub struct RewardPayment {
    pub beneficiary_index: RewardRecipient,
    pub amount: U256,
}

/// Which header's beneficiary a [`RewardPayment`] is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardRecipient {
    /// The block's own beneficiary.
    Block,
    /// The beneficiary of `ommers[index]`.
    Ommer(usize),
}

/// All reward payments owed for a block: the beneficiary's base reward plus
/// an inclusion bonus per ommer, plus each ommer's own (smaller) reward to
/// its own miner.
pub fn block_rewards(config: &HardforkConfig, block_number: u64, ommers: &[Header]) -> Vec<RewardPayment> {
    let mut payments = Vec::with_capacity(1 + ommers.len() * 2);

    let inclusion_bonus: U256 = ommers
        .iter()
        .map(|_| config.block_reward / U256::from(32))
        .fold(U256::zero(), |acc, x| acc + x);

    payments.push(RewardPayment {
        beneficiary_index: RewardRecipient::Block,
        amount: config.block_reward + inclusion_bonus,
    });

    if config.ommer_own_reward_enabled {
        for (i, ommer) in ommers.iter().enumerate() {
            let depth = block_number.saturating_sub(ommer.number);
            // (8 - depth) / 8 of the full reward, per the Yellow Paper; depth
            // is always in [1, 6] for a valid ommer (checked by the validator).
            let numerator = 8u64.saturating_sub(depth);
            let amount = config.block_reward * U256::from(numerator) / U256::from(8u64);
            payments.push(RewardPayment {
                beneficiary_index: RewardRecipient::Ommer(i),
                amount,
            });
        }
    }

    payments
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethcore_evm::hardfork::Hardfork;
    use ethcore_types::{Address, Bloom, Hash};

    fn ommer(number: u64) -> Header {
        Header {
            parent_hash: Hash::zero(),
            ommers_hash: Hash::zero(),
            beneficiary: Address::zero(),
            state_root: Hash::zero(),
            transactions_root: Hash::zero(),
            receipts_root: Hash::zero(),
            logs_bloom: Bloom::default(),
            difficulty: U256::zero(),
            number,
            gas_limit: 8_000_000,
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            mix_hash: Hash::zero(),
            nonce: 0,
            base_fee_per_gas: None,
        }
    }

    #[test]
    fn no_ommers_pays_only_the_base_reward() {
        let config = HardforkConfig::for_fork(Hardfork::Byzantium);
        let payments = block_rewards(&config, 100, &[]);
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, config.block_reward);
    }

    #[test]
    fn one_ommer_pays_inclusion_bonus_and_ommer_reward() {
        let config = HardforkConfig::for_fork(Hardfork::Byzantium);
        let payments = block_rewards(&config, 100, &[ommer(99)]);
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].amount, config.block_reward + config.block_reward / U256::from(32));
        // depth 1: 7/8 of the base reward.
        assert_eq!(payments[1].amount, config.block_reward * U256::from(7) / U256::from(8));
    }

    #[test]
    fn post_merge_reward_is_zero_and_has_no_ommer_side_payments() {
        let config = HardforkConfig::for_fork(Hardfork::Paris);
        let payments = block_rewards(&config, 100, &[ommer(99)]);
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, U256::zero());
    }
}
