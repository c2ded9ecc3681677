//! Minimal RLP encoder for header/transaction hashing.
//!
//! `ethcore-trie` owns RLP encoding for trie nodes; this is the small,
//! separate set of encoders the chain layer needs to hash headers and
//! transactions the same way the Yellow Paper does (`keccak256(rlp(item))`).
//! Both live under the same wire format but serve different callers, so
//! this stays a thin, chain-local module rather than a shared dependency.

use ethcore_types::{Address, Hash, U256};

/// Encode a single byte string per RLP's single-item rules.
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return vec![data[0]];
    }
    let mut out = length_prefix(0x80, 0xb7, 0xb8, data.len());
    out.extend_from_slice(data);
    out
}

/// Encode a list of already-RLP-encoded items.
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.iter().flat_map(|i| i.iter().copied()).collect();
    let mut out = length_prefix(0xc0, 0xf7, 0xf8, payload.len());
    out.extend_from_slice(&payload);
    out
}

fn length_prefix(short_base: u8, short_max: u8, long_base: u8, len: usize) -> Vec<u8> {
    if len <= (short_max - short_base) as usize {
        vec![short_base + len as u8]
    } else {
        let len_bytes = minimal_be_bytes(len as u64);
        let mut out = vec![long_base + len_bytes.len() as u8 - 1];
        out.extend_from_slice(&len_bytes);
        out
    }
}

fn minimal_be_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    bytes[first_nonzero..].to_vec()
}

/// Encode an unsigned integer as its minimal big-endian byte string (RLP
/// integers carry no leading zero bytes; zero itself encodes as the empty string).
pub fn encode_u64(value: u64) -> Vec<u8> {
    if value == 0 {
        return encode_bytes(&[]);
    }
    encode_bytes(&minimal_be_bytes(value))
}

/// Encode a 256-bit unsigned integer the same way.
pub fn encode_u256(value: U256) -> Vec<u8> {
    if value.is_zero() {
        return encode_bytes(&[]);
    }
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    let first_nonzero = buf.iter().position(|&b| b != 0).unwrap();
    encode_bytes(&buf[first_nonzero..])
}

/// Encode a fixed-size hash or address as an opaque byte string.
pub fn encode_fixed(bytes: &[u8]) -> Vec<u8> {
    encode_bytes(bytes)
}

/// RLP-encode a block header and return `keccak256` of the result, per the
/// Yellow Paper's block hash definition.
pub fn hash_header(header: &ethcore_types::Header) -> Hash {
    let mut fields = vec![
        encode_fixed(header.parent_hash.as_bytes()),
        encode_fixed(header.ommers_hash.as_bytes()),
        encode_fixed(header.beneficiary.as_bytes()),
        encode_fixed(header.state_root.as_bytes()),
        encode_fixed(header.transactions_root.as_bytes()),
        encode_fixed(header.receipts_root.as_bytes()),
        encode_bytes(&header.logs_bloom.0),
        encode_u256(header.difficulty),
        encode_u64(header.number),
        encode_u64(header.gas_limit),
        encode_u64(header.gas_used),
        encode_u64(header.timestamp),
        encode_bytes(&header.extra_data),
        encode_fixed(header.mix_hash.as_bytes()),
        encode_u64(header.nonce),
    ];
    if let Some(base_fee) = header.base_fee_per_gas {
        fields.push(encode_u256(base_fee));
    }
    let encoded = encode_list(&fields);
    let digest = ethcore_crypto::hashing::keccak256(&encoded);
    Hash::from_slice(&digest)
}

/// RLP-encode an address the way a transaction's `to` field is encoded:
/// the empty string for contract creation.
pub fn encode_address_option(address: Option<&Address>) -> Vec<u8> {
    match address {
        Some(a) => encode_fixed(a.as_bytes()),
        None => encode_bytes(&[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_empty_string_as_0x80() {
        assert_eq!(encode_bytes(&[]), vec![0x80]);
    }

    #[test]
    fn encodes_single_small_byte_as_itself() {
        assert_eq!(encode_bytes(&[0x05]), vec![0x05]);
    }

    #[test]
    fn encodes_single_byte_at_or_above_0x80_with_prefix() {
        assert_eq!(encode_bytes(&[0x80]), vec![0x81, 0x80]);
    }

    #[test]
    fn encodes_short_string() {
        assert_eq!(encode_bytes(b"dog"), vec![0x83, b'd', b'o', b'g']);
    }

    #[test]
    fn encodes_zero_as_empty_string() {
        assert_eq!(encode_u64(0), vec![0x80]);
    }

    #[test]
    fn encodes_empty_list() {
        assert_eq!(encode_list(&[]), vec![0xc0]);
    }
}
