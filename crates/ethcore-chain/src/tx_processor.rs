//! Transaction processing.
//!
//! Runs one transaction to completion: preflight validation, intrinsic gas
//! and upfront balance checks, dispatch to the EVM, hardfork-aware refund
//! accounting, balance settlement, and receipt synthesis. Mirrors the Yellow
//! Paper's `Υ` transition function; each step either returns a [`TxError`]
//! (transaction rejected, no state touched) or proceeds to the next.

use crate::convert::{address_from_evm, address_to_evm, hash_to_evm};
use crate::error::TxError;
use async_trait::async_trait;
use ethcore_evm::domain::entities::{BlockContext, ExecutionResult, Log as EvmLog, StateChange};
use ethcore_evm::domain::value_objects::Bytes as EvmBytes;
use ethcore_evm::hardfork::HardforkConfig;
use ethcore_evm::errors::VmError;
use ethcore_evm::ports::inbound::{SignedTransaction as EvmSignedTransaction, SmartContractApi};
use ethcore_types::{Address, Log, Receipt, ReceiptOutcome, Transaction, TransactionAction, U256};

/// Per-transaction account bookkeeping the processor needs beyond what the
/// EVM's own `StateAccess` port exposes (balance/nonce writes, since the EVM
/// port only surfaces `state_changes` for the caller to apply).
#[async_trait]
pub trait AccountLedger: Send + Sync {
    async fn nonce(&self, address: Address) -> u64;
    async fn balance(&self, address: Address) -> U256;
    async fn set_nonce(&mut self, address: Address, nonce: u64);
    async fn credit(&mut self, address: Address, amount: U256);
    /// Debit `amount` from `address`. Caller guarantees sufficient balance
    /// (checked during preflight); this never goes negative.
    async fn debit(&mut self, address: Address, amount: U256);
    /// Root hash of the account/storage trie as it stands right now. Only
    /// consulted pre-Byzantium, where receipts commit to this instead of a
    /// pass/fail status (EIP-658).
    async fn state_root(&self) -> ethcore_types::Hash;
}

/// Intrinsic gas: the base 21000, plus calldata cost (4 gas/zero byte, 16
/// gas/nonzero byte post-Istanbul, 68 before), plus 32000 for contract
/// creation, plus access-list costs (Berlin+).
pub fn intrinsic_gas(tx: &Transaction, config: &HardforkConfig) -> u64 {
    let mut gas = 21_000u64;

    let nonzero_byte_cost = if config.is_at_least(ethcore_evm::hardfork::Hardfork::Istanbul) { 16 } else { 68 };
    for byte in &tx.data {
        gas += if *byte == 0 { 4 } else { nonzero_byte_cost };
    }

    if matches!(tx.action, TransactionAction::Create) {
        gas += 32_000;
    }

    if config.access_lists_enabled {
        for (_, keys) in &tx.access_list {
            gas += 2_400; // per-address access-list cost (EIP-2930)
            gas += 1_900 * keys.len() as u64; // per-storage-key cost
        }
    }

    gas
}

/// The outcome of successfully processing one transaction.
pub struct ProcessedTransaction {
    pub receipt: Receipt,
    pub gas_used: u64,
}

/// Validate a transaction against its sender's account state and the
/// remaining gas in the block, without executing it.
pub async fn preflight<L: AccountLedger + ?Sized>(
    tx: &Transaction,
    sender: Address,
    ledger: &L,
    config: &HardforkConfig,
    block_gas_remaining: u64,
    base_fee: Option<U256>,
) -> Result<(), TxError> {
    if let Some(type_id) = tx.type_id {
        let active = match type_id {
            1 => config.access_lists_enabled,
            2 => config.base_fee_enabled,
            _ => false,
        };
        if !active {
            return Err(TxError::TypeNotActive(type_id));
        }
    }

    if config.enforce_low_s {
        let mut s_bytes = [0u8; 32];
        tx.signature.s.to_big_endian(&mut s_bytes);
        if !ethcore_crypto::ecdsa::is_low_s(&s_bytes) {
            return Err(TxError::SignatureNotLowS(tx.signature.s.to_string()));
        }
    }

    let account_nonce = ledger.nonce(sender).await;
    if account_nonce != tx.nonce {
        return Err(TxError::NonceMismatch { account: account_nonce, tx: tx.nonce });
    }

    if tx.gas_limit > block_gas_remaining {
        return Err(TxError::GasLimitExceedsBlock { gas_limit: tx.gas_limit, remaining: block_gas_remaining });
    }

    let intrinsic = intrinsic_gas(tx, config);
    if tx.gas_limit < intrinsic {
        return Err(TxError::IntrinsicGasNotMet { gas_limit: tx.gas_limit, intrinsic });
    }

    if let (Some(max_fee), Some(base)) = (tx.max_fee_per_gas, base_fee) {
        if max_fee < base {
            return Err(TxError::MaxFeeBelowBaseFee { max_fee: max_fee.to_string(), base_fee: base.to_string() });
        }
    }

    let price = tx.effective_gas_price(base_fee);
    let required = U256::from(tx.gas_limit) * price + tx.value;
    let balance = ledger.balance(sender).await;
    if balance < required {
        return Err(TxError::InsufficientBalance { balance: balance.to_string(), required: required.to_string() });
    }

    Ok(())
}

/// Run a transaction end to end: preflight, upfront gas deduction, EVM
/// dispatch, refund accounting, balance settlement, and receipt synthesis.
/// `sender` must already have been recovered from the transaction's
/// signature (see [`crate::error::TxError::InvalidSignature`] at the call site).
#[allow(clippy::too_many_arguments)]
pub async fn process_transaction<L: AccountLedger + ?Sized>(
    tx: &Transaction,
    sender: Address,
    tx_hash: ethcore_types::Hash,
    ledger: &mut L,
    vm: &dyn SmartContractApi,
    config: &HardforkConfig,
    block: &BlockContext,
    block_gas_remaining: u64,
    cumulative_gas_used: u64,
) -> Result<ProcessedTransaction, TxError> {
    preflight(tx, sender, ledger, config, block_gas_remaining, block.base_fee.into()).await?;

    let price = tx.effective_gas_price(Some(block.base_fee));
    let upfront_cost = U256::from(tx.gas_limit) * price;
    ledger.debit(sender, upfront_cost).await;
    ledger.set_nonce(sender, tx.nonce + 1).await;

    let evm_tx = EvmSignedTransaction {
        from: address_to_evm(sender),
        to: match &tx.action {
            TransactionAction::Call(to) => Some(address_to_evm(*to)),
            TransactionAction::Create => None,
        },
        value: tx.value,
        nonce: tx.nonce,
        gas_price: price,
        gas_limit: tx.gas_limit,
        data: EvmBytes::from_vec(tx.data.clone()),
        hash: hash_to_evm(tx_hash),
    };

    let intrinsic = intrinsic_gas(tx, config);
    let execution_gas_limit = tx.gas_limit - intrinsic;
    let result = dispatch(vm, &evm_tx, block, execution_gas_limit).await;

    let (success, gas_used_by_vm, gas_refund, logs, state_changes, revert_reason) = match result {
        Ok(r) => (r.success, r.gas_used, r.gas_refund, r.logs, r.state_changes, r.revert_reason),
        Err(e) => (false, execution_gas_limit, 0, Vec::new(), Vec::new(), Some(e.to_string())),
    };
    let _ = revert_reason;

    let gas_used_excluding_refund = intrinsic + gas_used_by_vm;
    let refund = ethcore_evm::evm::gas::calculate_refund_for_fork(gas_used_excluding_refund, gas_refund, config);
    let total_gas_used = gas_used_excluding_refund.saturating_sub(refund);

    // Refund unused gas (including the capped SSTORE refund) to the sender.
    let unused = U256::from(tx.gas_limit.saturating_sub(total_gas_used)) * price;
    ledger.credit(sender, unused).await;

    // Pay the fee for gas actually spent. Pre-London the full price goes to
    // the beneficiary; post-London only the priority tip does, while the
    // base-fee portion is burned (simply not credited to anyone).
    let priority_fee = if config.base_fee_enabled {
        price.saturating_sub(block.base_fee)
    } else {
        price
    };
    ledger
        .credit(address_from_evm(block.coinbase), priority_fee * U256::from(total_gas_used))
        .await;

    if success {
        for change in &state_changes {
            apply_state_change(change, ledger).await;
        }
    }

    let converted_logs: Vec<Log> = logs.iter().map(convert_log).collect();
    let mut logs_bloom = ethcore_types::Bloom::default();
    for log in &converted_logs {
        logs_bloom.or_with(&log.bloom());
    }

    let outcome = if config.is_at_least(ethcore_evm::hardfork::Hardfork::Byzantium) {
        ReceiptOutcome::Status(success)
    } else {
        // Pre-Byzantium receipts commit to the state root as it stands right
        // after this transaction's balance/nonce settlement above.
        ReceiptOutcome::StateRoot(ledger.state_root().await)
    };

    let receipt = Receipt {
        outcome,
        cumulative_gas_used: cumulative_gas_used + total_gas_used,
        logs_bloom,
        logs: converted_logs,
    };

    Ok(ProcessedTransaction { receipt, gas_used: total_gas_used })
}

async fn dispatch(
    vm: &dyn SmartContractApi,
    tx: &EvmSignedTransaction,
    block: &BlockContext,
    gas_limit: u64,
) -> Result<ExecutionResult, VmError> {
    let mut tx = tx.clone();
    tx.gas_limit = gas_limit;
    vm.execute_transaction(&tx, block).await
}

async fn apply_state_change<L: AccountLedger + ?Sized>(change: &StateChange, ledger: &mut L) {
    match change {
        StateChange::BalanceTransfer { from, to, amount } => {
            ledger.debit(address_from_evm(*from), *amount).await;
            ledger.credit(address_from_evm(*to), *amount).await;
        }
        StateChange::NonceIncrement { address } => {
            let addr = address_from_evm(*address);
            let current = ledger.nonce(addr).await;
            ledger.set_nonce(addr, current + 1).await;
        }
        // Storage/code/self-destruct changes are applied by the state/trie
        // layer that owns the account's storage trie and code store, not by
        // the balance ledger; the processor only reconciles balances/nonces here.
        StateChange::StorageWrite { .. }
        | StateChange::StorageDelete { .. }
        | StateChange::ContractCreate { .. }
        | StateChange::ContractDestroy { .. } => {}
    }
}

fn convert_log(log: &EvmLog) -> Log {
    Log {
        address: address_from_evm(log.address),
        topics: log.topics.iter().map(|h| crate::convert::hash_from_evm(*h)).collect(),
        data: log.data.as_slice().to_vec(),
    }
}
