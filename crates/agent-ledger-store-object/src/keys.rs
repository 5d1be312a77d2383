// crates/agent-ledger-store-object/src/keys.rs
// ============================================================================
// Module: Object Key Layout
// Description: Key scheme for events and the cached head object.
// Purpose: Keep lexicographic listing order equal to sequence order.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The key layout is part of the wire contract: `{prefix}/{seq:010}.json`
//! for events and `{prefix}/_head.json` for the optional cached head. No
//! other keys are ever written. Zero padding to ten digits keeps ordering
//! correct up to 9,999,999,999 events.

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the cached head object under the prefix.
const HEAD_OBJECT: &str = "_head.json";
/// Suffix of event objects.
const EVENT_SUFFIX: &str = ".json";
/// Zero-padded digit count for sequence numbers in keys.
const SEQ_DIGITS: usize = 10;

// ============================================================================
// SECTION: Key Construction
// ============================================================================

/// Normalizes a prefix so it is either empty or ends with exactly one slash.
#[must_use]
pub fn normalize_prefix(prefix: Option<&str>) -> String {
    let trimmed = prefix.unwrap_or("").trim_matches('/');
    if trimmed.is_empty() { String::new() } else { format!("{trimmed}/") }
}

/// Builds the object key for an event sequence number.
#[must_use]
pub fn event_key(prefix: &str, seq: u64) -> String {
    format!("{prefix}{seq:0width$}{EVENT_SUFFIX}", width = SEQ_DIGITS)
}

/// Builds the object key of the cached head.
#[must_use]
pub fn head_key(prefix: &str) -> String {
    format!("{prefix}{HEAD_OBJECT}")
}

/// Extracts the sequence number from an event key, if it is one.
#[must_use]
pub fn seq_from_key(prefix: &str, key: &str) -> Option<u64> {
    let rest = key.strip_prefix(prefix)?;
    let digits = rest.strip_suffix(EVENT_SUFFIX)?;
    if digits.len() != SEQ_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::event_key;
    use super::head_key;
    use super::normalize_prefix;
    use super::seq_from_key;

    #[test]
    fn prefix_normalization_is_idempotent() {
        assert_eq!(normalize_prefix(None), "");
        assert_eq!(normalize_prefix(Some("")), "");
        assert_eq!(normalize_prefix(Some("ledger")), "ledger/");
        assert_eq!(normalize_prefix(Some("/ledger/")), "ledger/");
        assert_eq!(normalize_prefix(Some("ledger/")), "ledger/");
    }

    #[test]
    fn event_keys_are_zero_padded_to_ten_digits() {
        assert_eq!(event_key("ledger/", 0), "ledger/0000000000.json");
        assert_eq!(event_key("ledger/", 42), "ledger/0000000042.json");
        assert_eq!(event_key("", 9_999_999_999), "9999999999.json");
    }

    #[test]
    fn lexicographic_order_equals_numeric_order() {
        let low = event_key("p/", 99);
        let high = event_key("p/", 100);
        assert!(low < high);
    }

    #[test]
    fn seq_round_trips_through_keys() {
        let key = event_key("ledger/", 7);
        assert_eq!(seq_from_key("ledger/", &key), Some(7));
        assert_eq!(seq_from_key("ledger/", &head_key("ledger/")), None);
        assert_eq!(seq_from_key("other/", &key), None);
        assert_eq!(seq_from_key("", "123.json"), None);
    }
}
