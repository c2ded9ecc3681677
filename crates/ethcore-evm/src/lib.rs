//! EVM bytecode interpreter: a stack machine executing contract code under
//! gas metering, with nested call frames and hardfork-gated opcode/gas
//! behavior.
//!
//! ## Execution limits
//!
//! | Limit | Value | Purpose |
//! |-------|-------|---------|
//! | `max_call_depth` | 1024 | Call/create nesting limit |
//! | `max_code_size` | 24 KB (EIP-170) | Deployed contract size |
//! | `max_init_code_size` | 48 KB (EIP-3860) | Init code size |
//! | `max_stack_size` | 1024 | EVM stack limit |
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Interpreter | `evm/interpreter.rs` | Main execution loop |
//! | Stack | `evm/stack.rs` | 1024-item stack |
//! | Memory | `evm/memory.rs` | Dynamic memory with gas |
//! | Gas | `evm/gas.rs` | Cost tables & calculations |
//! | Hardfork config | `hardfork.rs` | Per-fork opcode/gas/reward record |
//! | Precompiles | `evm/precompiles/` | ecrecover, sha256, identity, modexp |

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod events;
pub mod evm;
pub mod hardfork;
pub mod optimizer;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccountState, BlockContext, ExecutionContext, ExecutionResult, EvmVersion, Log,
        StateChange, VmConfig,
    };

    // Value objects
    pub use crate::domain::value_objects::{
        Address, Bytes, EcdsaSignature, GasCounter, Hash, StorageKey, StorageValue, U256,
    };

    // Domain services
    pub use crate::domain::services::{
        compute_contract_address, compute_contract_address_create2, estimate_base_gas, keccak256,
        precompiles,
    };

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, limits, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::{
        BatchExecutor, HtlcExecutor, HtlcOperation, SignedTransaction, SmartContractApi,
        TransactionReceipt,
    };
    pub use crate::ports::outbound::{
        AccessList, AccessStatus, BlockHashOracle, SignatureVerifier, StateAccess,
        TransientStorage,
    };

    // Events
    pub use crate::events::{
        subsystem_ids, topics, ExecuteHTLCRequestPayload, ExecuteHTLCResponsePayload,
        ExecuteTransactionRequestPayload, ExecuteTransactionResponsePayload,
        GetCodeRequestPayload, GetCodeResponsePayload, HtlcOperationPayload,
        StateReadRequestPayload, StateReadResponsePayload, StateWriteRequestPayload,
        StateWriteResponsePayload,
    };

    // Errors
    pub use crate::errors::{IpcError, PrecompileError, StateError, VmError};

    // EVM components
    pub use crate::evm::{
        gas, memory::Memory, opcodes::Opcode, stack::Stack,
        transient::TransientStorage as EvmTransientStorage, Interpreter,
    };

    // Hardfork configuration
    pub use crate::hardfork::{Hardfork, HardforkConfig, SstoreScheme};

    // Adapters
    pub use crate::adapters::{InMemoryAccessList, InMemoryState, SmartContractEventHandler};

    // Service
    pub use crate::service::{
        create_test_service, ServiceConfig, ServiceStats, SmartContractService,
    };
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #[test]
    fn test_prelude_exports() {
        use super::prelude::*;
        let _ = VmConfig::default();
        let _ = Address::ZERO;
    }
}
