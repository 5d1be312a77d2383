// crates/agent-ledger-core/src/core/canonical.rs
// ============================================================================
// Module: Canonical Serialization
// Description: RFC 8785 canonical JSON bytes with a strict no-float surface.
// Purpose: Provide the single source of hash input for the entire engine.
// Dependencies: serde_jcs, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! Every hash in the engine is computed over bytes produced by this module.
//! Canonicalization follows RFC 8785 (JCS): mapping keys sorted by Unicode
//! code point, compact separators, shortest-form integers, single spellings
//! for booleans and null, and arrays in insertion order.
//!
//! The engine is stricter than JCS in one respect: floating-point values are
//! forbidden anywhere in the hashed surface. Quantities must be integers or
//! decimal strings. Rejection happens here, before serialization, so callers
//! get a [`CanonicalError::FloatForbidden`] naming the offending path instead
//! of a silently lossy encoding.
//!
//! Per RFC 8785 the number space is I-JSON: integers must be exactly
//! representable as IEEE doubles (|n| <= 2^53). Larger magnitudes, such as
//! byte counts above 8 PiB, belong in decimal strings, which is
//! how the adapter encodes workspace sizes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonicalization errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// A floating-point number was found in the value tree.
    #[error("floating-point value forbidden at {path}")]
    FloatForbidden {
        /// JSON-pointer-style path to the offending value.
        path: String,
    },
    /// The serializer failed to encode the value.
    #[error("canonical encoding failed: {0}")]
    Encoding(String),
}

// ============================================================================
// SECTION: Canonical Bytes
// ============================================================================

/// Produces the canonical RFC 8785 byte representation of a JSON value.
///
/// # Errors
///
/// Returns [`CanonicalError::FloatForbidden`] when the value tree contains a
/// floating-point number, or [`CanonicalError::Encoding`] when serialization
/// fails.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    reject_floats(value, "$")?;
    serde_jcs::to_vec(value).map_err(|err| CanonicalError::Encoding(err.to_string()))
}

/// Produces the canonical representation as a UTF-8 string.
///
/// # Errors
///
/// Returns [`CanonicalError`] when canonicalization fails.
pub fn canonical_string(value: &Value) -> Result<String, CanonicalError> {
    let bytes = canonical_bytes(value)?;
    String::from_utf8(bytes).map_err(|err| CanonicalError::Encoding(err.to_string()))
}

/// Hashes the canonical bytes of a JSON value with SHA-256.
///
/// # Errors
///
/// Returns [`CanonicalError`] when canonicalization fails.
pub fn hash_canonical(value: &Value) -> Result<String, CanonicalError> {
    let bytes = canonical_bytes(value)?;
    Ok(sha256_hex(&bytes))
}

/// Computes the lowercase hex SHA-256 digest of raw bytes.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    to_hex(&digest)
}

/// Renders bytes as lowercase hex.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(hex_digit(byte >> 4));
        out.push(hex_digit(byte & 0x0f));
    }
    out
}

/// Parses a lowercase or uppercase hex string into bytes.
///
/// # Errors
///
/// Returns [`CanonicalError::Encoding`] when the input has odd length or
/// contains a non-hex character.
pub fn from_hex(hex: &str) -> Result<Vec<u8>, CanonicalError> {
    if !hex.len().is_multiple_of(2) {
        return Err(CanonicalError::Encoding("hex string has odd length".to_string()));
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    let bytes = hex.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let high = hex_value(pair[0])
            .ok_or_else(|| CanonicalError::Encoding("invalid hex character".to_string()))?;
        let low = hex_value(pair[1])
            .ok_or_else(|| CanonicalError::Encoding("invalid hex character".to_string()))?;
        out.push((high << 4) | low);
    }
    Ok(out)
}

// ============================================================================
// SECTION: Internal Helpers
// ============================================================================

/// Maps a nibble to its lowercase hex digit.
const fn hex_digit(nibble: u8) -> char {
    match nibble {
        0 ..= 9 => (b'0' + nibble) as char,
        _ => (b'a' + nibble - 10) as char,
    }
}

/// Maps an ASCII hex digit to its value.
const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0' ..= b'9' => Some(byte - b'0'),
        b'a' ..= b'f' => Some(byte - b'a' + 10),
        b'A' ..= b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Walks the value tree and rejects any floating-point number.
fn reject_floats(value: &Value, path: &str) -> Result<(), CanonicalError> {
    match value {
        Value::Number(number) => {
            if number.as_u64().is_none() && number.as_i64().is_none() {
                return Err(CanonicalError::FloatForbidden { path: path.to_string() });
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                reject_floats(item, &format!("{path}[{index}]"))?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for (key, item) in map {
                reject_floats(item, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use serde_json::json;

    use super::canonical_bytes;
    use super::canonical_string;
    use super::from_hex;
    use super::hash_canonical;
    use super::sha256_hex;
    use super::CanonicalError;

    #[test]
    fn map_key_order_is_irrelevant() {
        let left = json!({"b": 2, "a": 1});
        let right = json!({"a": 1, "b": 2});
        assert_eq!(canonical_bytes(&left).unwrap(), canonical_bytes(&right).unwrap());
    }

    #[test]
    fn arrays_preserve_insertion_order() {
        let left = json!([1, 2, 3]);
        let right = json!([3, 2, 1]);
        assert_ne!(canonical_bytes(&left).unwrap(), canonical_bytes(&right).unwrap());
    }

    #[test]
    fn floats_are_rejected_with_path() {
        let value = json!({"outer": {"inner": [1, 2.5]}});
        let err = canonical_bytes(&value).unwrap_err();
        match err {
            CanonicalError::FloatForbidden { path } => {
                assert_eq!(path, "$.outer.inner[1]");
            }
            CanonicalError::Encoding(_) => panic!("expected float rejection"),
        }
    }

    #[test]
    fn integers_emit_shortest_decimal() {
        let value = json!({"n": 42u64});
        assert_eq!(canonical_string(&value).unwrap(), r#"{"n":42}"#);
    }

    #[test]
    fn golden_hash_empty_object() {
        // SHA-256 of "{}".
        let digest = hash_canonical(&json!({})).unwrap();
        assert_eq!(digest, "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a");
    }

    #[test]
    fn golden_hash_bytes_direct() {
        // SHA-256 of "test".
        let digest = sha256_hex(b"test");
        assert_eq!(digest, "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08");
    }

    #[test]
    fn hex_round_trip() {
        let bytes = from_hex("abcdef12").unwrap();
        assert_eq!(bytes, vec![0xab, 0xcd, 0xef, 0x12]);
        assert_eq!(super::to_hex(&bytes), "abcdef12");
    }

    #[test]
    fn hex_rejects_odd_length() {
        assert!(from_hex("abc").is_err());
    }
}
