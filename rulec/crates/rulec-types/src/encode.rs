//! Canonical 256-bit word encoding.
//!
//! Fixed-size values occupy a word directly: unsigned integers big-endian,
//! addresses right-aligned, booleans as 0/1. Dynamic values (strings, long
//! byte arrays) are ABI-encoded and hashed with keccak256; the digest is the
//! word the engine compares against. Mapped-tracker keys and values use the
//! packed (non-ABI) encoding instead.

use sha3::{Digest, Keccak256};

use crate::{LiteralValue, U256};

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// ABI-encode a dynamic byte payload: head offset, length, padded data.
pub fn abi_encode_bytes(data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(64 + padded_len);

    // head: offset of the dynamic part
    out.extend_from_slice(&word_bytes(U256::from(32u64)));
    // length
    out.extend_from_slice(&word_bytes(U256::from(data.len() as u64)));
    // payload, right-padded to a word boundary
    out.extend_from_slice(data);
    out.resize(64 + padded_len, 0);

    out
}

/// Encode a literal to its canonical instruction-stream word.
///
/// This is the encoding used for `N` operands: strings and oversized byte
/// arrays become the keccak digest of their ABI encoding; everything else is
/// the value itself. 256-bit magnitudes are preserved exactly.
pub fn encode_word(value: &LiteralValue) -> U256 {
    match value {
        LiteralValue::Uint(v) => *v,
        LiteralValue::Bool(b) => {
            if *b {
                U256::one()
            } else {
                U256::zero()
            }
        }
        LiteralValue::Address(a) => U256::from_big_endian(a.as_bytes()),
        LiteralValue::Str(s) => {
            U256::from_big_endian(&keccak256(&abi_encode_bytes(s.as_bytes())))
        }
        LiteralValue::Bytes(b) => {
            if b.len() <= 32 {
                U256::from_big_endian(b)
            } else {
                U256::from_big_endian(&keccak256(&abi_encode_bytes(b)))
            }
        }
    }
}

/// Encode a mapped-tracker key or value with the packed representation.
///
/// Short strings and byte arrays occupy a left-aligned word; longer payloads
/// hash their raw bytes (no ABI head or length prefix).
pub fn encode_packed(value: &LiteralValue) -> U256 {
    match value {
        LiteralValue::Str(s) => packed_bytes_word(s.as_bytes()),
        LiteralValue::Bytes(b) => packed_bytes_word(b),
        other => encode_word(other),
    }
}

fn packed_bytes_word(data: &[u8]) -> U256 {
    if data.len() > 32 {
        return U256::from_big_endian(&keccak256(data));
    }
    let mut buf = [0u8; 32];
    buf[..data.len()].copy_from_slice(data);
    U256::from_big_endian(&buf)
}

fn word_bytes(v: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    v.to_big_endian(&mut buf);
    buf
}
