//! ECDSA over secp256k1.
//!
//! Covers both directions the protocol needs: signing/verifying with a
//! keypair, and recovering a sender's public key from a transaction's
//! `(v, r, s)` signature and the hash it was signed over (`ecrecover`).

use crate::CryptoError;
use k256::ecdsa::{
    signature::{Signer, Verifier},
    RecoveryId, Signature, SigningKey, VerifyingKey,
};
use zeroize::Zeroize;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from compressed bytes (33 bytes, starting with 0x02 or 0x03).
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self, CryptoError> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Verify a signature.
    pub fn verify(
        &self,
        message: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }

    /// Ethereum address: the low 20 bytes of `keccak256(uncompressed_pubkey[1..])`.
    pub fn to_address(&self) -> Result<[u8; 20], CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let uncompressed = verifying_key.to_encoded_point(false);
        let hash = crate::hashing::keccak256(&uncompressed.as_bytes()[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        Ok(address)
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; 64]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        let sec1_bytes = verifying_key.to_sec1_bytes();
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(&sec1_bytes[..33]);
        Secp256k1PublicKey(bytes)
    }

    /// Sign a message (deterministic RFC 6979).
    pub fn sign(&self, message: &[u8]) -> Secp256k1Signature {
        let sig: Signature = self.signing_key.sign(message);
        let bytes: [u8; 64] = sig.to_bytes().into();
        Secp256k1Signature(bytes)
    }

    /// Sign a 32-byte digest and return `(r, s, recovery_id)`, the form a
    /// transaction signature is stored in.
    pub fn sign_recoverable(&self, digest: &[u8; 32]) -> ([u8; 32], [u8; 32], u8) {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .expect("32-byte digest is always a valid prehash");
        let bytes: [u8; 64] = sig.to_bytes().into();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        (r, s, recid.to_byte())
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

/// Recover the signer's public key from a transaction signature.
///
/// `digest` is the Keccak-256 hash the signature covers (for legacy
/// transactions, the RLP hash of the 6-field unsigned transaction plus
/// `chain_id` per EIP-155; for typed transactions, the hash of the typed
/// payload). `recovery_id` is `0` or `1` — callers normalize the wire `v`
/// value (`27/28` for legacy pre-EIP-155, `{0,1}` for typed transactions, or
/// `35 + chain_id*2 + recovery_id` for EIP-155) down to this before calling.
pub fn recover(
    digest: &[u8; 32],
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: u8,
) -> Result<Secp256k1PublicKey, CryptoError> {
    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(r);
    sig_bytes[32..].copy_from_slice(s);
    let signature = Signature::from_slice(&sig_bytes).map_err(|_| CryptoError::InvalidSignature)?;
    let recid = RecoveryId::from_byte(recovery_id).ok_or(CryptoError::InvalidSignature)?;

    let verifying_key = VerifyingKey::recover_from_prehash(digest, &signature, recid)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    let sec1_bytes = verifying_key.to_sec1_bytes();
    let mut bytes = [0u8; 33];
    bytes.copy_from_slice(&sec1_bytes[..33]);
    Ok(Secp256k1PublicKey(bytes))
}

/// Recover the signer's Ethereum address directly.
pub fn recover_address(
    digest: &[u8; 32],
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: u8,
) -> Result<[u8; 20], CryptoError> {
    recover(digest, r, s, recovery_id)?.to_address()
}

/// `secp256k1`'s group order, halved. EIP-2 rejects signatures with
/// `s` above this to remove transaction malleability.
pub const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// `true` if `s` is within the lower half of the curve order (EIP-2).
pub fn is_low_s(s: &[u8; 32]) -> bool {
    s.as_slice() <= SECP256K1_HALF_ORDER.as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Secp256k1KeyPair::generate();
        let message = b"Hello, secp256k1!";

        let signature = keypair.sign(message);
        let result = keypair.public_key().verify(message, &signature);

        assert!(result.is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let keypair = Secp256k1KeyPair::generate();

        let signature = keypair.sign(b"message1");
        let result = keypair.public_key().verify(b"message2", &signature);

        assert!(result.is_err());
    }

    #[test]
    fn test_deterministic_signatures() {
        let keypair = Secp256k1KeyPair::from_bytes([0xABu8; 32]).unwrap();
        let message = b"deterministic test";

        let sig1 = keypair.sign(message);
        let sig2 = keypair.sign(message);

        assert_eq!(sig1.as_bytes(), sig2.as_bytes());
    }

    #[test]
    fn test_roundtrip_bytes() {
        let original = Secp256k1KeyPair::generate();
        let bytes = original.to_bytes();
        let restored = Secp256k1KeyPair::from_bytes(bytes).unwrap();

        assert_eq!(original.public_key(), restored.public_key());
    }

    #[test]
    fn test_sign_recoverable_roundtrip() {
        let keypair = Secp256k1KeyPair::generate();
        let digest = crate::hashing::keccak256(b"a transaction's rlp encoding");

        let (r, s, recid) = keypair.sign_recoverable(&digest);
        let recovered = recover(&digest, &r, &s, recid).unwrap();

        assert_eq!(recovered, keypair.public_key());
    }

    #[test]
    fn test_recover_address_matches_public_key_address() {
        let keypair = Secp256k1KeyPair::generate();
        let digest = crate::hashing::keccak256(b"another transaction");

        let (r, s, recid) = keypair.sign_recoverable(&digest);
        let address = recover_address(&digest, &r, &s, recid).unwrap();

        assert_eq!(address, keypair.public_key().to_address().unwrap());
    }

    #[test]
    fn test_low_s_check() {
        assert!(is_low_s(&[0u8; 32]));
        assert!(!is_low_s(&[0xffu8; 32]));
    }
}
