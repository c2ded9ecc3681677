//! Boundary conversions between `ethcore-types`' canonical `H160`/`H256`
//! domain types and `ethcore-evm`'s own `Address`/`Hash` value objects.
//!
//! `ethcore-evm` predates this crate and defines its own 20/32-byte wrapper
//! types at its port boundary so the interpreter has no dependency on the
//! rest of the engine. Rather than reaching into the interpreter to change
//! that (and risk destabilizing the gas/opcode table it's built around),
//! `ethcore-chain` does the conversion explicitly at its single call site
//! into `ethcore-evm`. Both sides agree on `U256` (both re-export
//! `primitive_types::U256`), so only addresses and hashes need translating.

use ethcore_evm::domain::value_objects::{Address as EvmAddress, Hash as EvmHash};
use ethcore_types::{Address, Hash};

pub fn address_to_evm(address: Address) -> EvmAddress {
    EvmAddress::new(address.0)
}

pub fn address_from_evm(address: EvmAddress) -> Address {
    Address::from(*address.as_bytes())
}

pub fn hash_to_evm(hash: Hash) -> EvmHash {
    EvmHash::new(hash.0)
}

pub fn hash_from_evm(hash: EvmHash) -> Hash {
    Hash::from(*hash.as_bytes())
}

// `EvmAddress::as_bytes`/`EvmHash::as_bytes` return `&[u8; N]` (see
// `ethcore_evm::domain::value_objects`), so the dereferences above copy a
// fixed-size array, not a slice.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips() {
        let original = Address::from_low_u64_be(0xdead_beef);
        assert_eq!(address_from_evm(address_to_evm(original)), original);
    }

    #[test]
    fn hash_round_trips() {
        let original = Hash::from_low_u64_be(0xcafe_babe);
        assert_eq!(hash_from_evm(hash_to_evm(original)), original);
    }
}
