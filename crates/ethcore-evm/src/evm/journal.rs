//! # Execution Journal
//!
//! `StateAccess` only exposes immediate reads and a handful of queued
//! writes (`set_storage`); balance transfers, nonce bumps, contract
//! creation and destruction are collected as [`StateChange`](crate::domain::entities::StateChange)
//! entries and committed by the caller once the whole transaction succeeds.
//! That's fine for a single top-level call, but a nested CALL/DELEGATECALL
//! needs to see the balance and storage writes its caller already made in
//! this same transaction, and a reverted sub-call must not leak them back
//! out. `Journal` is the in-flight overlay that makes both true: every read
//! checks the overlay before falling through to `StateAccess`, and
//! `checkpoint`/`restore` give a sub-call a point to roll back to.

use crate::domain::value_objects::{Address, Bytes, StorageKey, StorageValue, U256};
use crate::evm::transient::TransientStorage;
use std::collections::{HashMap, HashSet};

/// In-transaction overlay for balances, nonces, code, storage and account
/// lifecycle, plus EIP-1153 transient storage. Cloned as a checkpoint before
/// every sub-call and restored wholesale if that sub-call reverts.
#[derive(Debug, Default, Clone)]
pub struct Journal {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    codes: HashMap<Address, Bytes>,
    storage: HashMap<(Address, StorageKey), StorageValue>,
    destroyed: HashSet<Address>,
    created_this_tx: HashSet<Address>,
    transient: TransientStorage,
}

impl Journal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the overlay so it can be restored if a sub-call reverts.
    #[must_use]
    pub fn checkpoint(&self) -> Self {
        self.clone()
    }

    /// Discard everything written since `checkpoint` was taken.
    pub fn restore(&mut self, checkpoint: Self) {
        *self = checkpoint;
    }

    #[must_use]
    pub fn balance(&self, address: Address) -> Option<U256> {
        self.balances.get(&address).copied()
    }

    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.balances.insert(address, balance);
    }

    #[must_use]
    pub fn nonce(&self, address: Address) -> Option<u64> {
        self.nonces.get(&address).copied()
    }

    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.nonces.insert(address, nonce);
    }

    #[must_use]
    pub fn code(&self, address: Address) -> Option<&Bytes> {
        self.codes.get(&address)
    }

    pub fn set_code(&mut self, address: Address, code: Bytes) {
        self.codes.insert(address, code);
    }

    #[must_use]
    pub fn storage(&self, address: Address, key: StorageKey) -> Option<StorageValue> {
        self.storage.get(&(address, key)).copied()
    }

    pub fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.storage.insert((address, key), value);
    }

    #[must_use]
    pub fn is_destroyed(&self, address: Address) -> bool {
        self.destroyed.contains(&address)
    }

    pub fn mark_destroyed(&mut self, address: Address) {
        self.destroyed.insert(address);
    }

    pub fn mark_created(&mut self, address: Address) {
        self.created_this_tx.insert(address);
    }

    #[must_use]
    pub fn was_created_this_tx(&self, address: Address) -> bool {
        self.created_this_tx.contains(&address)
    }

    #[must_use]
    pub fn tload(&self, address: Address, key: StorageKey) -> StorageValue {
        self.transient.tload(&address, &key)
    }

    pub fn tstore(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        self.transient.tstore(address, key, value);
    }

    /// Called once at the end of a transaction (EIP-1153: transient storage
    /// never outlives the transaction that wrote it).
    pub fn clear_transient(&mut self) {
        self.transient.clear();
    }
}
