//! Hardfork configuration.
//!
//! The gas table in [`crate::evm::gas`] is a single flat snapshot (already
//! Shanghai-shaped: `PUSH0`, `TLOAD`/`TSTORE`, `MCOPY` all have entries).
//! What changes release to release isn't the opcode encoding, it's which
//! opcodes are *active*, how a handful of gas formulas are computed (SSTORE,
//! refunds, access lists), and whether a given precompile exists yet.
//! [`HardforkConfig`] is one flat, owned record capturing exactly that; each
//! `Hardfork` variant has a builder function that starts from the prior
//! fork's record and overrides only the fields that changed, rather than a
//! runtime fallback chain walked on every opcode dispatch.

use crate::domain::value_objects::U256;

/// A named protocol upgrade, in activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hardfork {
    Frontier,
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Paris,
    Shanghai,
    Cancun,
}

/// The SSTORE gas-accounting scheme in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SstoreScheme {
    /// Frontier-Constantinople: flat 5000/20000/200 by current-vs-new value only.
    Flat,
    /// EIP-2200 (Istanbul): current/original/new triple, net-gas metering.
    NetGasEip2200,
    /// EIP-2929 + EIP-2200 (Berlin+): as above, plus a cold-slot surcharge.
    NetGasEip2929,
}

/// One flat, fully-resolved configuration record for a hardfork. Every
/// field here is the value to use directly — no further fork lookups.
#[derive(Debug, Clone)]
pub struct HardforkConfig {
    pub name: Hardfork,

    // EIP-2929/2930: access lists and the cold/warm split.
    pub access_lists_enabled: bool,

    pub sstore_scheme: SstoreScheme,
    /// Refund divisor applied to `gas_used` (2 pre-London, 5 from London per EIP-3529).
    pub max_refund_divisor: u64,
    /// Refund credited per SSTORE that clears a storage slot (4800 from EIP-3529, 15000 before).
    pub sstore_clear_refund: u64,

    /// EIP-3541: reject contract code starting with 0xEF.
    pub reject_ef_prefix_code: bool,
    /// EIP-3529: SELFDESTRUCT no longer refunds gas.
    pub selfdestruct_refund: bool,
    /// EIP-1153: TLOAD/TSTORE transient storage.
    pub transient_storage_enabled: bool,
    /// EIP-5656: MCOPY opcode.
    pub mcopy_enabled: bool,
    /// EIP-3855: PUSH0 opcode.
    pub push0_enabled: bool,
    /// EIP-1559: base fee / dynamic-fee transactions.
    pub base_fee_enabled: bool,
    /// DELEGATECALL opcode active (Homestead+).
    pub delegatecall_enabled: bool,
    /// REVERT opcode + reason-returning reverts active (Byzantium+).
    pub revert_enabled: bool,
    /// STATICCALL opcode active (Byzantium+).
    pub staticcall_enabled: bool,
    /// CREATE2 opcode active (Constantinople+).
    pub create2_enabled: bool,
    /// EXTCODEHASH opcode active (Constantinople+).
    pub extcodehash_enabled: bool,
    /// Shift opcodes SHL/SHR/SAR active (Constantinople+).
    pub shift_opcodes_enabled: bool,
    /// CHAINID and SELFBALANCE opcodes active (Istanbul+).
    pub chainid_selfbalance_enabled: bool,

    /// EIP-2 signature malleability protection: reject `s` above half the curve order.
    pub enforce_low_s: bool,

    /// Fixed block reward paid to the beneficiary, in wei. Ethereum never
    /// halves this the way Bitcoin halves its coinbase; it only changes at
    /// fork boundaries (5 ETH Frontier, 3 ETH Byzantium, 2 ETH Constantinople,
    /// 0 from the Paris/Merge transition to proof-of-stake).
    pub block_reward: U256,
    /// Ommer inclusion reward as `block_reward * numerator / 32` per included ommer.
    pub ommer_reward_numerator: u64,
    /// Reward paid to an ommer's own miner: `block_reward * (8 + ommer.number - block.number) / 8`.
    pub ommer_own_reward_enabled: bool,

    /// `true` once proof-of-work mining has been replaced by the beacon chain (the Merge).
    pub proof_of_stake: bool,
    /// Ice-age bomb delay subtracted from the block number before computing the
    /// exponential difficulty bomb term, per EIP-649/1234/2384/3554/4345/5133.
    pub bomb_delay_blocks: u64,

    /// Which of the standard precompiles (keyed by their address's last byte,
    /// 0x01-0x09) are deployed under this fork.
    pub precompiles: &'static [u8],
}

fn base_precompiles() -> &'static [u8] {
    &[0x01, 0x02, 0x03, 0x04]
}

fn ether(whole: u64) -> U256 {
    U256::from(whole) * U256::from(10).pow(U256::from(18))
}

impl HardforkConfig {
    /// `true` if `self` is at or after `other` in activation order.
    pub fn is_at_least(&self, other: Hardfork) -> bool {
        self.name >= other
    }

    pub fn frontier() -> Self {
        Self {
            name: Hardfork::Frontier,
            access_lists_enabled: false,
            sstore_scheme: SstoreScheme::Flat,
            max_refund_divisor: 2,
            sstore_clear_refund: 15_000,
            reject_ef_prefix_code: false,
            selfdestruct_refund: true,
            transient_storage_enabled: false,
            mcopy_enabled: false,
            push0_enabled: false,
            base_fee_enabled: false,
            delegatecall_enabled: false,
            revert_enabled: false,
            staticcall_enabled: false,
            create2_enabled: false,
            extcodehash_enabled: false,
            shift_opcodes_enabled: false,
            chainid_selfbalance_enabled: false,
            enforce_low_s: false,
            block_reward: ether(5),
            ommer_reward_numerator: 8,
            ommer_own_reward_enabled: true,
            proof_of_stake: false,
            bomb_delay_blocks: 0,
            precompiles: base_precompiles(),
        }
    }

    pub fn homestead() -> Self {
        Self {
            name: Hardfork::Homestead,
            delegatecall_enabled: true,
            enforce_low_s: true,
            ..Self::frontier()
        }
    }

    pub fn tangerine_whistle() -> Self {
        // EIP-150: repriced IO-heavy opcodes. Costs already reflect this in
        // the flat gas table; no new fields toggle here.
        Self {
            name: Hardfork::TangerineWhistle,
            ..Self::homestead()
        }
    }

    pub fn spurious_dragon() -> Self {
        // EIP-161: empty-account cleanup (handled by the trie/account facade,
        // not a gas-table concern), EIP-170: max code size (checked at
        // CREATE time, not modeled as a config flag here).
        Self {
            name: Hardfork::SpuriousDragon,
            ..Self::tangerine_whistle()
        }
    }

    pub fn byzantium() -> Self {
        Self {
            name: Hardfork::Byzantium,
            revert_enabled: true,
            staticcall_enabled: true,
            block_reward: ether(3),
            ..Self::spurious_dragon()
        }
    }

    pub fn constantinople() -> Self {
        Self {
            name: Hardfork::Constantinople,
            sstore_scheme: SstoreScheme::NetGasEip2200,
            create2_enabled: true,
            extcodehash_enabled: true,
            shift_opcodes_enabled: true,
            block_reward: ether(2),
            bomb_delay_blocks: 5_000_000,
            ..Self::byzantium()
        }
    }

    pub fn petersburg() -> Self {
        // Constantinople's EIP-1283 SSTORE repricing was reverted for Petersburg
        // (reentrancy concerns); the net-gas metering itself returns for Istanbul.
        Self {
            name: Hardfork::Petersburg,
            sstore_scheme: SstoreScheme::Flat,
            ..Self::constantinople()
        }
    }

    pub fn istanbul() -> Self {
        Self {
            name: Hardfork::Istanbul,
            sstore_scheme: SstoreScheme::NetGasEip2200,
            chainid_selfbalance_enabled: true,
            bomb_delay_blocks: 9_000_000,
            ..Self::petersburg()
        }
    }

    pub fn berlin() -> Self {
        Self {
            name: Hardfork::Berlin,
            access_lists_enabled: true,
            sstore_scheme: SstoreScheme::NetGasEip2929,
            ..Self::istanbul()
        }
    }

    pub fn london() -> Self {
        Self {
            name: Hardfork::London,
            base_fee_enabled: true,
            max_refund_divisor: 5,
            sstore_clear_refund: 4_800,
            selfdestruct_refund: false,
            bomb_delay_blocks: 9_700_000,
            ..Self::berlin()
        }
    }

    pub fn paris() -> Self {
        Self {
            name: Hardfork::Paris,
            proof_of_stake: true,
            ommer_own_reward_enabled: false,
            block_reward: U256::zero(),
            ..Self::london()
        }
    }

    pub fn shanghai() -> Self {
        Self {
            name: Hardfork::Shanghai,
            push0_enabled: true,
            ..Self::paris()
        }
    }

    pub fn cancun() -> Self {
        Self {
            name: Hardfork::Cancun,
            transient_storage_enabled: true,
            mcopy_enabled: true,
            precompiles: &[0x01, 0x02, 0x03, 0x04, 0x0a],
            ..Self::shanghai()
        }
    }

    /// Build the config for a named fork.
    pub fn for_fork(fork: Hardfork) -> Self {
        match fork {
            Hardfork::Frontier => Self::frontier(),
            Hardfork::Homestead => Self::homestead(),
            Hardfork::TangerineWhistle => Self::tangerine_whistle(),
            Hardfork::SpuriousDragon => Self::spurious_dragon(),
            Hardfork::Byzantium => Self::byzantium(),
            Hardfork::Constantinople => Self::constantinople(),
            Hardfork::Petersburg => Self::petersburg(),
            Hardfork::Istanbul => Self::istanbul(),
            Hardfork::Berlin => Self::berlin(),
            Hardfork::London => Self::london(),
            Hardfork::Paris => Self::paris(),
            Hardfork::Shanghai => Self::shanghai(),
            Hardfork::Cancun => Self::cancun(),
        }
    }
}
