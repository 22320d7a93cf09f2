//! rulec-types - Primitive type tags, 256-bit words, and literal encoding.
//!
//! Everything the rules engine sees is a 256-bit word. This crate owns the
//! closed set of primitive type tags, the literal value model, and the
//! canonical encodings: big-endian unsigned integers, right-aligned
//! addresses, 0/1 booleans, and keccak digests of ABI-encoded dynamic data.

pub mod address;
pub mod encode;

pub use address::{parse_address, to_checksum};
pub use encode::{abi_encode_bytes, encode_packed, encode_word, keccak256};

pub use primitive_types::{H160, U256};

use std::fmt;

/// Primitive type tag.
///
/// The closed set of types the engine understands. Schema records carry
/// these as lowercase tags (`uint256`, `string`, `address`, `bytes`,
/// `bool`, `void`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    #[cfg_attr(feature = "serde", serde(rename = "uint256"))]
    Uint256,
    #[cfg_attr(feature = "serde", serde(rename = "string"))]
    Str,
    #[cfg_attr(feature = "serde", serde(rename = "address"))]
    Address,
    #[cfg_attr(feature = "serde", serde(rename = "bytes"))]
    Bytes,
    #[cfg_attr(feature = "serde", serde(rename = "bool"))]
    Bool,
    #[cfg_attr(feature = "serde", serde(rename = "void"))]
    Void,
}

impl PrimitiveType {
    /// Parse a schema type tag.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag {
            "uint256" => Some(PrimitiveType::Uint256),
            "string" => Some(PrimitiveType::Str),
            "address" => Some(PrimitiveType::Address),
            "bytes" => Some(PrimitiveType::Bytes),
            "bool" => Some(PrimitiveType::Bool),
            "void" => Some(PrimitiveType::Void),
            _ => None,
        }
    }

    /// The schema tag for this type.
    pub fn tag(&self) -> &'static str {
        match self {
            PrimitiveType::Uint256 => "uint256",
            PrimitiveType::Str => "string",
            PrimitiveType::Address => "address",
            PrimitiveType::Bytes => "bytes",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Void => "void",
        }
    }

    /// Returns true for types that support arithmetic and ordering.
    pub fn is_numeric(&self) -> bool {
        matches!(self, PrimitiveType::Uint256)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Errors produced while parsing or encoding literal values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("`{0}` is not a valid {1} literal")]
    InvalidLiteral(String, PrimitiveType),
    #[error("address `{0}` must be 0x-prefixed 40-digit hex")]
    BadAddress(String),
    #[error("address `{0}` fails checksum validation")]
    BadChecksum(String),
    #[error("values of type {0} cannot be encoded")]
    Unencodable(PrimitiveType),
}

/// A literal value carried through compilation.
///
/// Literals are parsed at their declared (or inferred) type and encoded to
/// a canonical word only at emission time, so 256-bit magnitudes survive
/// untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiteralValue {
    Uint(U256),
    Bool(bool),
    Address(H160),
    Str(String),
    Bytes(Vec<u8>),
}

impl LiteralValue {
    /// Parse a literal at the given declared type.
    pub fn parse(text: &str, ty: PrimitiveType) -> Result<Self, EncodeError> {
        let text = text.trim();
        match ty {
            PrimitiveType::Uint256 => {
                let value = if let Some(hex_digits) =
                    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
                {
                    U256::from_str_radix(hex_digits, 16).ok()
                } else {
                    U256::from_dec_str(text).ok()
                };
                value
                    .map(LiteralValue::Uint)
                    .ok_or_else(|| EncodeError::InvalidLiteral(text.into(), ty))
            }
            PrimitiveType::Bool => match text {
                "true" => Ok(LiteralValue::Bool(true)),
                "false" => Ok(LiteralValue::Bool(false)),
                _ => Err(EncodeError::InvalidLiteral(text.into(), ty)),
            },
            PrimitiveType::Address => parse_address(text).map(LiteralValue::Address),
            PrimitiveType::Str => {
                // Schema values may carry surrounding quotes
                let inner = text
                    .strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .unwrap_or(text);
                Ok(LiteralValue::Str(inner.to_owned()))
            }
            PrimitiveType::Bytes => {
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .ok_or_else(|| EncodeError::InvalidLiteral(text.into(), ty))?;
                if digits.len() % 2 != 0 {
                    return Err(EncodeError::InvalidLiteral(text.into(), ty));
                }
                hex::decode(digits)
                    .map(LiteralValue::Bytes)
                    .map_err(|_| EncodeError::InvalidLiteral(text.into(), ty))
            }
            PrimitiveType::Void => Err(EncodeError::Unencodable(ty)),
        }
    }

    /// The primitive type of this literal.
    pub fn ty(&self) -> PrimitiveType {
        match self {
            LiteralValue::Uint(_) => PrimitiveType::Uint256,
            LiteralValue::Bool(_) => PrimitiveType::Bool,
            LiteralValue::Address(_) => PrimitiveType::Address,
            LiteralValue::Str(_) => PrimitiveType::Str,
            LiteralValue::Bytes(_) => PrimitiveType::Bytes,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Uint(v) => write!(f, "{v}"),
            LiteralValue::Bool(b) => write!(f, "{b}"),
            LiteralValue::Address(a) => write!(f, "{}", to_checksum(a)),
            LiteralValue::Str(s) => write!(f, "\"{s}\""),
            LiteralValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
        }
    }
}
