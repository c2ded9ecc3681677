//! Exercises the EVM service and the state trie together: run a contract
//! call through [`SmartContractService`], then apply the resulting state
//! changes to a [`PatriciaMerkleTrie`] the way a block processor would.

use ethcore_evm::adapters::{InMemoryAccessList, InMemoryState};
use ethcore_evm::domain::entities::{AccountState as EvmAccountState, BlockContext, StateChange};
use ethcore_evm::domain::value_objects::{Address as EvmAddress, Bytes, Hash as EvmHash, U256};
use ethcore_evm::events::{subsystem_ids, ExecuteTransactionRequestPayload};
use ethcore_evm::service::{ServiceConfig, SmartContractService};
use ethcore_trie::{AccountState as TrieAccountState, PatriciaMerkleTrie, StateManagementApi};
use uuid::Uuid;

fn evm_addr(byte: u8) -> EvmAddress {
    EvmAddress([byte; 20])
}

fn trie_addr(byte: u8) -> [u8; 20] {
    [byte; 20]
}

/// `PUSH1 0x2a PUSH1 0x00 SSTORE STOP` — writes 42 into storage slot 0.
const SSTORE_CODE: &[u8] = &[0x60, 0x2a, 0x60, 0x00, 0x55, 0x00];

/// Applies the subset of [`StateChange`]s a balance ledger would apply, the
/// same split `tx_processor::apply_state_change` makes: balances and nonces
/// go through the account facade, storage goes through the storage facade.
fn apply_state_changes(trie: &mut PatriciaMerkleTrie, changes: &[StateChange]) {
    for change in changes {
        match change {
            StateChange::BalanceTransfer { from, to, amount } => {
                let from = from.0;
                let to = to.0;
                let amount = amount.as_u128();
                let from_balance = trie.get_balance(from).unwrap();
                trie.set_balance(from, from_balance - amount).unwrap();
                let to_balance = trie.get_balance(to).unwrap();
                trie.set_balance(to, to_balance + amount).unwrap();
            }
            StateChange::StorageWrite { address, key, value } => {
                StateManagementApi::put_storage(trie, address.0, key.0, value.0).unwrap();
            }
            StateChange::StorageDelete { address, key } => {
                trie.delete_storage(address.0, key.0).unwrap();
            }
            StateChange::ContractCreate { .. } | StateChange::ContractDestroy { .. } => {}
        }
    }
}

#[tokio::test]
async fn contract_call_storage_write_lands_in_trie() {
    let caller = evm_addr(0x11);
    let contract = evm_addr(0x22);

    let state = InMemoryState::new();
    state.set_account(caller, EvmAccountState::new_eoa(U256::from(1_000_000u64), 0));
    state.set_code(contract, Bytes::from_vec(SSTORE_CODE.to_vec()));

    let service = SmartContractService::new(state, InMemoryAccessList::new(), ServiceConfig::default());

    let payload = ExecuteTransactionRequestPayload {
        from: caller,
        to: Some(contract),
        value: U256::zero(),
        nonce: 0,
        gas_price: U256::from(1u64),
        gas_limit: 100_000,
        data: Bytes::new(),
        tx_hash: EvmHash::ZERO,
        block_context: BlockContext::default(),
    };

    let response = service
        .handle_execute_transaction(subsystem_ids::CONSENSUS, Uuid::new_v4(), payload)
        .await
        .expect("authorized sender is accepted");

    assert!(response.success, "SSTORE of a constant should never revert");
    assert!(
        response
            .state_changes
            .iter()
            .any(|c| matches!(c, StateChange::StorageWrite { .. })),
        "SSTORE must surface as a StorageWrite state change"
    );

    let mut trie = PatriciaMerkleTrie::new();
    trie.put_account(trie_addr(0x22), TrieAccountState::new(0))
        .unwrap();
    let root_before = trie.root_hash();

    apply_state_changes(&mut trie, &response.state_changes);

    let root_after = trie.root_hash();
    assert_ne!(root_before, root_after, "writing storage must move the root");

    let mut key = [0u8; 32];
    key[31] = 0;
    let stored = StateManagementApi::get_storage(&trie, trie_addr(0x22), key, None)
        .unwrap()
        .expect("slot 0 was written");
    let mut expected = [0u8; 32];
    expected[31] = 0x2a;
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn balance_transfer_change_settles_both_sides_in_trie() {
    let mut trie = PatriciaMerkleTrie::new();
    let sender = trie_addr(0x33);
    let receiver = trie_addr(0x44);
    trie.put_account(sender, TrieAccountState::new(5_000)).unwrap();
    trie.put_account(receiver, TrieAccountState::new(0)).unwrap();

    let changes = vec![StateChange::BalanceTransfer {
        from: EvmAddress(sender),
        to: EvmAddress(receiver),
        amount: U256::from(1_500u64),
    }];

    apply_state_changes(&mut trie, &changes);

    assert_eq!(trie.get_balance(sender).unwrap(), 3_500);
    assert_eq!(trie.get_balance(receiver).unwrap(), 1_500);
}
