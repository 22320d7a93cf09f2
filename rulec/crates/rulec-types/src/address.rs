//! Address parsing and checksum rendering.
//!
//! Addresses are 160-bit hex with EIP-55 mixed-case checksums. Parsing
//! accepts uniform-case input as-is; mixed-case input must carry a valid
//! checksum. Rendering always produces the checksummed form.

use crate::encode::keccak256;
use crate::{EncodeError, H160};

/// Parse a `0x`-prefixed 40-digit hex address.
///
/// Mixed-case input is validated against its EIP-55 checksum; all-lowercase
/// and all-uppercase inputs are accepted without one.
pub fn parse_address(text: &str) -> Result<H160, EncodeError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| EncodeError::BadAddress(text.into()))?;

    if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EncodeError::BadAddress(text.into()));
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| EncodeError::BadAddress(text.into()))?;
    let addr = H160::from_slice(&bytes);

    let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
    let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());
    if has_lower && has_upper {
        let checksummed = to_checksum(&addr);
        if checksummed[2..] != *digits {
            return Err(EncodeError::BadChecksum(text.into()));
        }
    }

    Ok(addr)
}

/// Render an address in EIP-55 checksum form.
pub fn to_checksum(addr: &H160) -> String {
    let lower = hex::encode(addr.as_bytes());
    let digest = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 {
            digest[i / 2] >> 4
        } else {
            digest[i / 2] & 0x0f
        };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vectors from the EIP-55 specification
    const VECTORS: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_checksum_round_trip() {
        for vector in VECTORS {
            let addr = parse_address(vector).expect("valid checksummed address");
            assert_eq!(to_checksum(&addr), *vector);
        }
    }

    #[test]
    fn test_lowercase_accepted() {
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let addr = parse_address(lower).expect("lowercase accepted");
        assert_eq!(to_checksum(&addr), VECTORS[0]);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        // Flip one letter's case in a valid checksummed address
        let bad = "0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(matches!(
            parse_address(bad),
            Err(EncodeError::BadChecksum(_))
        ));
    }

    #[test]
    fn test_malformed_addresses_rejected() {
        assert!(parse_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xzz6916095ca1df60bb79ce92ce3ea74c37c5d359").is_err());
    }
}
