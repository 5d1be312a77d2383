// crates/agent-ledger-adapter/src/quantity.rs
// ============================================================================
// Module: Resource Quantities
// Description: Decimal-exact parsing of workspace size quantities.
// Purpose: Normalize human-entered sizes to canonical byte counts.
// Dependencies: bigdecimal, thiserror
// ============================================================================

//! ## Overview
//! Workspace sizes arrive as platform-style quantity strings ("1Gi",
//! "512Mi", "2G", plain integers). Normalization converts them to an exact
//! decimal byte count rendered as a string, which is the only form allowed
//! on the hashed surface. Arithmetic is decimal-exact via `BigDecimal`;
//! fractional byte results round up so a requested capacity is never
//! silently shrunk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::str::FromStr;

use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use bigdecimal::rounding::RoundingMode;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Quantity parsing errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuantityError {
    /// The quantity string is empty or syntactically invalid.
    #[error("invalid quantity: {0}")]
    Invalid(String),
    /// The quantity suffix is not recognized.
    #[error("unknown quantity suffix: {0}")]
    UnknownSuffix(String),
    /// The quantity is zero or negative.
    #[error("quantity must be positive: {0}")]
    NotPositive(String),
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Multiplier table for recognized suffixes.
///
/// Binary suffixes are powers of 1024; bare SI suffixes are powers of 1000.
const SUFFIXES: [(&str, u128); 11] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
    ("Pi", 1 << 50),
    ("Ei", 1 << 60),
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
    ("P", 1_000_000_000_000_000),
];

/// Converts a quantity string to an exact decimal byte count string.
///
/// Fractional results (for example `"1.1Gi"`) round up to the next whole
/// byte.
///
/// # Errors
///
/// Returns [`QuantityError`] for empty input, unknown suffixes, malformed
/// numbers, or non-positive quantities.
pub fn quantity_to_bytes(quantity: &str) -> Result<String, QuantityError> {
    let trimmed = quantity.trim();
    if trimmed.is_empty() {
        return Err(QuantityError::Invalid(quantity.to_string()));
    }
    let (digits, multiplier) = split_suffix(trimmed)?;
    let value = BigDecimal::from_str(digits)
        .map_err(|_| QuantityError::Invalid(quantity.to_string()))?;
    if value <= BigDecimal::from(0) {
        return Err(QuantityError::NotPositive(quantity.to_string()));
    }
    let scaled = value * BigDecimal::from(BigInt::from(multiplier));
    let rounded = scaled.with_scale_round(0, RoundingMode::Ceiling);
    let (bytes, _exponent) = rounded.into_bigint_and_exponent();
    Ok(bytes.to_string())
}

/// Splits a quantity into its numeric part and suffix multiplier.
fn split_suffix(quantity: &str) -> Result<(&str, u128), QuantityError> {
    for (suffix, multiplier) in SUFFIXES {
        if let Some(digits) = quantity.strip_suffix(suffix) {
            return Ok((digits, multiplier));
        }
    }
    if quantity.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-') {
        return Ok((quantity, 1));
    }
    let suffix: String =
        quantity.chars().skip_while(|c| c.is_ascii_digit() || *c == '.' || *c == '-').collect();
    Err(QuantityError::UnknownSuffix(suffix))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use super::QuantityError;
    use super::quantity_to_bytes;

    #[test]
    fn binary_suffixes_scale_by_1024() {
        assert_eq!(quantity_to_bytes("1Gi").unwrap(), "1073741824");
        assert_eq!(quantity_to_bytes("512Mi").unwrap(), "536870912");
        assert_eq!(quantity_to_bytes("2Ki").unwrap(), "2048");
    }

    #[test]
    fn si_suffixes_scale_by_1000() {
        assert_eq!(quantity_to_bytes("2G").unwrap(), "2000000000");
        assert_eq!(quantity_to_bytes("3k").unwrap(), "3000");
    }

    #[test]
    fn plain_integers_pass_through() {
        assert_eq!(quantity_to_bytes("1048576").unwrap(), "1048576");
    }

    #[test]
    fn fractional_quantities_round_up() {
        // 1.5Gi is exactly integral; 1.1Gi is not and must round up.
        assert_eq!(quantity_to_bytes("1.5Gi").unwrap(), "1610612736");
        assert_eq!(quantity_to_bytes("1.1Gi").unwrap(), "1181116007");
    }

    #[test]
    fn zero_and_negative_are_rejected() {
        assert_eq!(
            quantity_to_bytes("0"),
            Err(QuantityError::NotPositive("0".to_string()))
        );
        assert_eq!(
            quantity_to_bytes("-1Gi"),
            Err(QuantityError::NotPositive("-1Gi".to_string()))
        );
    }

    #[test]
    fn unknown_suffix_is_rejected() {
        assert!(matches!(
            quantity_to_bytes("1Q"),
            Err(QuantityError::UnknownSuffix(_))
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(quantity_to_bytes("  "), Err(QuantityError::Invalid(_))));
    }
}
