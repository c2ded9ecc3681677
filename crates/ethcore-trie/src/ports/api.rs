use crate::domain::{
    self, AccountState, Address, ConflictInfo, Hash, PatriciaMerkleTrie, StateError, StateProof,
    StorageKey, StorageProof, StorageValue, TransactionAccessPattern,
};

/// Primary API for state operations
pub trait StateManagementApi: Send + Sync {
    // === State Reads ===

    fn get_account_state(
        &self,
        address: Address,
        block_number: Option<u64>,
    ) -> Result<Option<AccountState>, StateError>;

    fn get_storage(
        &self,
        address: Address,
        key: StorageKey,
        block_number: Option<u64>,
    ) -> Result<Option<StorageValue>, StateError>;

    fn get_balance(
        &self,
        address: Address,
        block_number: Option<u64>,
    ) -> Result<u128, StateError>;

    fn get_nonce(
        &self,
        address: Address,
        block_number: Option<u64>,
    ) -> Result<u64, StateError>;

    fn get_code(&self, code_hash: Hash) -> Result<Vec<u8>, StateError>;

    // === State Writes ===

    /// Write an account's full state (balance, nonce, code hash, storage root).
    fn put_account(&mut self, address: Address, state: AccountState) -> Result<(), StateError>;

    /// Write a storage slot. A zero value is normalized to key deletion
    /// (a zeroed slot is indistinguishable from an absent one).
    fn put_storage(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError>;

    /// Store contract bytecode, returning its Keccak256 hash.
    fn put_code(&mut self, code: Vec<u8>) -> Hash;

    // === Proofs ===

    fn get_state_proof(
        &self,
        address: Address,
        block_number: Option<u64>,
    ) -> Result<StateProof, StateError>;

    fn get_storage_proof(
        &self,
        address: Address,
        keys: Vec<StorageKey>,
        block_number: Option<u64>,
    ) -> Result<StorageProof, StateError>;

    // === Validation ===

    fn check_balance(
        &self,
        address: Address,
        required: u128,
    ) -> Result<bool, StateError>;

    fn get_expected_nonce(
        &self,
        address: Address,
    ) -> Result<u64, StateError>;

    // === Conflict Detection ===

    fn detect_conflicts(
        &self,
        access_patterns: Vec<TransactionAccessPattern>,
    ) -> Result<Vec<ConflictInfo>, StateError>;

    // === State Root ===

    fn get_state_root(&self, block_number: u64) -> Result<Hash, StateError>;

    fn get_current_state_root(&self) -> Result<Hash, StateError>;
}

/// `PatriciaMerkleTrie` only ever tracks current state, not per-block
/// snapshots, so `block_number` on a read and `get_state_root`'s argument
/// are accepted but ignored: every query answers against the latest root.
impl StateManagementApi for PatriciaMerkleTrie {
    fn get_account_state(
        &self,
        address: Address,
        _block_number: Option<u64>,
    ) -> Result<Option<AccountState>, StateError> {
        self.get_account(address)
    }

    fn get_storage(
        &self,
        address: Address,
        key: StorageKey,
        _block_number: Option<u64>,
    ) -> Result<Option<StorageValue>, StateError> {
        PatriciaMerkleTrie::get_storage(self, address, key)
    }

    fn get_balance(
        &self,
        address: Address,
        _block_number: Option<u64>,
    ) -> Result<u128, StateError> {
        PatriciaMerkleTrie::get_balance(self, address)
    }

    fn get_nonce(
        &self,
        address: Address,
        _block_number: Option<u64>,
    ) -> Result<u64, StateError> {
        PatriciaMerkleTrie::get_nonce(self, address)
    }

    fn get_code(&self, code_hash: Hash) -> Result<Vec<u8>, StateError> {
        PatriciaMerkleTrie::get_code(self, code_hash)
    }

    fn put_account(&mut self, address: Address, state: AccountState) -> Result<(), StateError> {
        PatriciaMerkleTrie::put_account(self, address, state)
    }

    fn put_storage(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), StateError> {
        PatriciaMerkleTrie::put_storage(self, address, key, value)
    }

    fn put_code(&mut self, code: Vec<u8>) -> Hash {
        PatriciaMerkleTrie::put_code(self, code)
    }

    fn get_state_proof(
        &self,
        address: Address,
        _block_number: Option<u64>,
    ) -> Result<StateProof, StateError> {
        self.generate_proof(address)
    }

    fn get_storage_proof(
        &self,
        address: Address,
        keys: Vec<StorageKey>,
        _block_number: Option<u64>,
    ) -> Result<StorageProof, StateError> {
        let key = keys.first().copied().unwrap_or([0u8; 32]);
        self.generate_storage_proof(address, key)
    }

    fn check_balance(&self, address: Address, required: u128) -> Result<bool, StateError> {
        Ok(PatriciaMerkleTrie::get_balance(self, address)? >= required)
    }

    fn get_expected_nonce(&self, address: Address) -> Result<u64, StateError> {
        PatriciaMerkleTrie::get_nonce(self, address)
    }

    fn detect_conflicts(
        &self,
        access_patterns: Vec<TransactionAccessPattern>,
    ) -> Result<Vec<ConflictInfo>, StateError> {
        Ok(domain::detect_conflicts(&access_patterns))
    }

    fn get_state_root(&self, _block_number: u64) -> Result<Hash, StateError> {
        Ok(self.root_hash())
    }

    fn get_current_state_root(&self) -> Result<Hash, StateError> {
        Ok(self.root_hash())
    }
}
