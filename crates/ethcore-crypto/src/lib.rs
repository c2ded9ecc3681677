//! Cryptographic primitives for the state-transition engine.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256 | Trie references, tx/receipt hashes, addresses |
//! | `ecdsa` | secp256k1 | Transaction signing and sender recovery |
//!
//! `signatures` (Ed25519) and `symmetric` (AEAD) are kept from the upstream
//! crate for callers outside the state-transition core (e.g. a future wire
//! protocol); the engine itself only needs `hashing` and `ecdsa`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use ecdsa::{recover, recover_address, Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_empty, Keccak256Hasher};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{decrypt, encrypt, Cipher, Nonce, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
