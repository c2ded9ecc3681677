//! Core domain entities shared by the trie, EVM, and chain crates.
//!
//! These are plain data — construction, validation, and hashing all live
//! closer to where they're used (`ethcore-trie` for accounts, `ethcore-evm`
//! for execution, `ethcore-chain` for blocks/transactions).

use primitive_types::{H160, H256};
use serde::{Deserialize, Serialize};

/// 256-bit unsigned integer, used for wei amounts and storage words.
pub use primitive_types::U256;

/// A 20-byte account address.
pub type Address = H160;

/// A 32-byte hash (trie node reference, block/transaction hash, storage key).
pub type Hash = H256;

/// 2048-bit logs bloom filter (256 bytes, 3 bits set per log topic/address).
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bloom(#[serde(with = "serde_bytes_array")] pub [u8; 256]);

impl Default for Bloom {
    fn default() -> Self {
        Self([0u8; 256])
    }
}

impl std::fmt::Debug for Bloom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bloom(0x{})", hex::encode(self.0))
    }
}

impl Bloom {
    /// Set the three bits derived from `keccak256(data)` per the Yellow Paper's `M3:2048` function.
    pub fn accrue(&mut self, data: &[u8]) {
        let hash = ethcore_crypto::hashing::keccak256(data);
        for i in [0usize, 2, 4] {
            let bit = (((hash[i] as usize) << 8) | hash[i + 1] as usize) & 0x7ff;
            let byte_index = 255 - bit / 8;
            let bit_index = bit % 8;
            self.0[byte_index] |= 1 << bit_index;
        }
    }

    /// OR this bloom with another, as done when folding a transaction's logs
    /// bloom into the cumulative block bloom.
    pub fn or_with(&mut self, other: &Bloom) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a |= b;
        }
    }

    /// `true` if every bit set in `other` is also set in `self`.
    pub fn contains(&self, other: &Bloom) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a & b) == *b)
    }
}

mod serde_bytes_array {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 256], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 256], D::Error> {
        let v: Vec<u8> = serde::Deserialize::deserialize(d)?;
        let mut out = [0u8; 256];
        if v.len() != 256 {
            return Err(serde::de::Error::invalid_length(v.len(), &"256"));
        }
        out.copy_from_slice(&v);
        Ok(out)
    }
}

/// An event log emitted by `LOG0`-`LOG4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// The contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (0 to 4 entries).
    pub topics: Vec<Hash>,
    /// Unindexed log data.
    pub data: Vec<u8>,
}

impl Log {
    /// Bloom contribution of this single log: the address plus each topic.
    pub fn bloom(&self) -> Bloom {
        let mut bloom = Bloom::default();
        bloom.accrue(self.address.as_bytes());
        for topic in &self.topics {
            bloom.accrue(topic.as_bytes());
        }
        bloom
    }
}

/// The action a transaction performs: call an existing account, or create one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAction {
    /// Message call to an existing (or not-yet-existing, for plain transfers) address.
    Call(Address),
    /// Contract creation; `init` code runs and its return value becomes the new account's code.
    Create,
}

/// An ECDSA signature over a transaction, in the wire `(v, r, s)` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// Recovery/chain-id-encoding byte. Legacy pre-EIP-155: 27/28. EIP-155: `35 + chain_id*2 + recid`.
    /// Typed transactions (EIP-2930/1559): bare recovery id, 0 or 1.
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

/// A transaction, covering the legacy, EIP-2930 (access list), and EIP-1559
/// (dynamic fee) envelopes. `type_id` distinguishes which fields apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// `None` for legacy transactions; `Some(1)` / `Some(2)` for typed ones.
    pub type_id: Option<u8>,
    pub chain_id: Option<u64>,
    pub nonce: u64,
    /// Legacy/EIP-2930 field; `None` for EIP-1559 transactions (use `max_fee_per_gas`).
    pub gas_price: Option<U256>,
    /// EIP-1559 fields.
    pub max_priority_fee_per_gas: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub gas_limit: u64,
    pub action: TransactionAction,
    pub value: U256,
    pub data: Vec<u8>,
    /// EIP-2930/1559 access list: addresses and storage keys pre-warmed at intrinsic-gas cost.
    pub access_list: Vec<(Address, Vec<Hash>)>,
    pub signature: TransactionSignature,
}

impl Transaction {
    /// Effective gas price given a block's base fee (EIP-1559 `min(max_fee, base_fee + priority)`).
    pub fn effective_gas_price(&self, base_fee: Option<U256>) -> U256 {
        match (self.gas_price, self.max_fee_per_gas, self.max_priority_fee_per_gas, base_fee) {
            (Some(price), _, _, _) => price,
            (None, Some(max_fee), Some(priority), Some(base)) => {
                let priority_capped = max_fee.saturating_sub(base).min(priority);
                base + priority_capped
            }
            (None, Some(max_fee), _, _) => max_fee,
            _ => U256::zero(),
        }
    }
}

/// A block header. Root hashes and `gas_used`/`logs_bloom` are commitments
/// the validator recomputes and checks against these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub parent_hash: Hash,
    pub ommers_hash: Hash,
    pub beneficiary: Address,
    pub state_root: Hash,
    pub transactions_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    pub mix_hash: Hash,
    pub nonce: u64,
    /// EIP-1559, `None` before London.
    pub base_fee_per_gas: Option<U256>,
}

/// A full block: header plus body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub ommers: Vec<Header>,
}

/// Status of a transaction's execution, recorded in its receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptOutcome {
    /// Pre-Byzantium: the state root immediately after this transaction.
    StateRoot(Hash),
    /// Post-Byzantium (EIP-658): `1` for success, `0` for revert/exceptional halt.
    Status(bool),
}

/// A transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub outcome: ReceiptOutcome,
    /// Gas used by all transactions in the block up to and including this one.
    pub cumulative_gas_used: u64,
    pub logs_bloom: Bloom,
    pub logs: Vec<Log>,
}

/// An account in the state trie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: Hash,
    pub code_hash: Hash,
}

impl AccountState {
    /// An account has never been written to and has default nonce/balance/code/storage.
    pub fn is_empty(&self, empty_code_hash: &Hash) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == *empty_code_hash
    }
}
