// crates/agent-ledger-core/src/core/chain.rs
// ============================================================================
// Module: Hash Chain
// Description: Per-event hash commitments linking each record to its predecessor.
// Purpose: Make the ledger tamper-evident and support hash-version evolution.
// Dependencies: crate::core::{canonical, event}, serde, thiserror
// ============================================================================

//! ## Overview
//! Every record commits to its predecessor: `event_hash` is the SHA-256 of
//! the previous hash concatenated with the canonical bytes of the event's
//! hash input. Two hash versions are supported concurrently:
//!
//! - **v1**: the hash input is `{type, aggregate_id, seq, ts, payload, meta}`
//!   with `meta` always present (an empty meta canonicalizes to `{}`).
//! - **v2**: the hash input additionally carries `hash_version: "v2"` and
//!   omits `meta` entirely when it carries nothing besides the version
//!   marker (the marker already lives at the top level of the input).
//!
//! The version is declared per event in `meta.hash_version`; absence selects
//! v1. Verification picks the matching rule per record, so logs may mix
//! versions (earlier events v1, later events v2).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::canonical::CanonicalError;
use crate::core::canonical::canonical_bytes;
use crate::core::canonical::sha256_hex;
use crate::core::event::Event;
use crate::core::event::LogRecord;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Previous-hash value carried by the genesis record: 64 zeros.
pub const GENESIS_PREV_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

// ============================================================================
// SECTION: Hash Version
// ============================================================================

/// Selector between canonical hash payload layouts.
///
/// # Invariants
/// - Wire spellings are `"v1"` and `"v2"` and are stable forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashVersion {
    /// Original layout: `meta` always included.
    #[default]
    V1,
    /// Stamped layout: `hash_version` field present, empty `meta` omitted.
    V2,
}

impl HashVersion {
    /// Returns the stable wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Hash-chain errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Canonicalization of the hash input failed.
    #[error("chain canonicalization failed: {0}")]
    Canonical(#[from] CanonicalError),
    /// A record's stored hash does not match its recomputed commitment.
    #[error("hash mismatch at seq {seq}")]
    HashMismatch {
        /// Sequence number of the offending record.
        seq: u64,
    },
    /// A record's `prev_hash` does not match its predecessor's `event_hash`.
    #[error("broken chain link at seq {seq}")]
    BrokenLink {
        /// Sequence number of the offending record.
        seq: u64,
    },
    /// Sequence numbers are not contiguous.
    #[error("sequence gap at seq {expected} (found {found})")]
    SequenceGap {
        /// Expected sequence number.
        expected: u64,
        /// Sequence number actually found.
        found: u64,
    },
    /// A sequence number appears more than once.
    #[error("duplicate seq {seq}")]
    DuplicateSeq {
        /// Duplicated sequence number.
        seq: u64,
    },
}

// ============================================================================
// SECTION: Hash Computation
// ============================================================================

/// Computes the hash commitment for an event chained onto `prev_hash`.
///
/// The hash version is taken from the event's own metadata.
///
/// # Errors
///
/// Returns [`ChainError::Canonical`] when the event contains a value that is
/// not canonicalizable (for example a floating-point number).
pub fn event_hash(prev_hash: &str, event: &Event) -> Result<String, ChainError> {
    let input = hash_input(event)?;
    let bytes = canonical_bytes(&input)?;
    let mut combined = Vec::with_capacity(prev_hash.len() + bytes.len());
    combined.extend_from_slice(prev_hash.as_bytes());
    combined.extend_from_slice(&bytes);
    Ok(sha256_hex(&combined))
}

/// Seals an event into a log record chained onto `prev_hash`.
///
/// # Errors
///
/// Returns [`ChainError`] when the hash commitment cannot be computed.
pub fn seal_record(prev_hash: &str, event: Event) -> Result<LogRecord, ChainError> {
    let hash = event_hash(prev_hash, &event)?;
    Ok(LogRecord { prev_hash: prev_hash.to_string(), event_hash: hash, event })
}

/// Builds the canonical hash input object for an event.
fn hash_input(event: &Event) -> Result<Value, ChainError> {
    let meta_value = serde_json::to_value(&event.meta)
        .map_err(|err| ChainError::Canonical(CanonicalError::Encoding(err.to_string())))?;
    let mut input = Map::new();
    input.insert("type".to_string(), Value::String(event.event_type.clone()));
    input.insert(
        "aggregate_id".to_string(),
        Value::String(event.aggregate_id.as_str().to_string()),
    );
    input.insert("seq".to_string(), Value::from(event.seq));
    input.insert("ts".to_string(), Value::from(event.ts));
    input.insert("payload".to_string(), event.payload.clone());
    match event.meta.effective_hash_version() {
        HashVersion::V1 => {
            input.insert("meta".to_string(), meta_value);
        }
        HashVersion::V2 => {
            input.insert(
                "hash_version".to_string(),
                Value::String(HashVersion::V2.as_str().to_string()),
            );
            if !event.meta.is_marker_only() {
                input.insert("meta".to_string(), meta_value);
            }
        }
    }
    Ok(Value::Object(input))
}

// ============================================================================
// SECTION: Chain Verification
// ============================================================================

/// Verifies an ordered slice of records as a contiguous chain segment.
///
/// Each record's hash is recomputed from its content under its declared hash
/// version; the recomputed value, not the stored `event_hash`, is what the
/// successor's `prev_hash` is checked against. Tampering with a record's
/// content therefore surfaces at the *following* sequence number, where the
/// link to the recomputed hash breaks. The stored `event_hash` of the final
/// record is checked against its recomputed value so a tampered tail cannot
/// hide behind the missing successor.
///
/// # Errors
///
/// Returns the [`ChainError`] describing the first offending record.
pub fn verify_chain(records: &[LogRecord]) -> Result<(), ChainError> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    if first.event.seq == 0 && first.prev_hash != GENESIS_PREV_HASH {
        return Err(ChainError::BrokenLink { seq: 0 });
    }
    let mut expected_seq = first.event.seq;
    // The first record's own prev_hash anchors mid-log segments.
    let mut expected_prev = first.prev_hash.clone();
    for record in records {
        if record.event.seq < expected_seq {
            return Err(ChainError::DuplicateSeq { seq: record.event.seq });
        }
        if record.event.seq > expected_seq {
            return Err(ChainError::SequenceGap {
                expected: expected_seq,
                found: record.event.seq,
            });
        }
        if record.prev_hash != expected_prev {
            return Err(ChainError::BrokenLink { seq: record.event.seq });
        }
        expected_prev = event_hash(&record.prev_hash, &record.event)?;
        expected_seq += 1;
    }
    // records is non-empty here; the loop above visited at least one record.
    if let Some(last) = records.last()
        && last.event_hash != expected_prev
    {
        return Err(ChainError::HashMismatch { seq: last.event.seq });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use serde_json::json;

    use super::GENESIS_PREV_HASH;
    use super::HashVersion;
    use super::event_hash;
    use super::seal_record;
    use super::verify_chain;
    use crate::core::event::Event;
    use crate::core::event::EventMeta;
    use crate::core::ids::AggregateId;

    /// Builds an `INC` event at the given sequence.
    fn sample_event(seq: u64) -> Event {
        Event {
            event_type: "INC".to_string(),
            aggregate_id: AggregateId::new("A"),
            seq,
            ts: seq + 1,
            payload: json!({"inc": 1}),
            meta: EventMeta::default(),
        }
    }

    #[test]
    fn v1_and_v2_hashes_differ_for_same_event() {
        let v1 = sample_event(0);
        let mut v2 = sample_event(0);
        v2.meta.hash_version = Some(HashVersion::V2);
        let hash_v1 = event_hash(GENESIS_PREV_HASH, &v1).unwrap();
        let hash_v2 = event_hash(GENESIS_PREV_HASH, &v2).unwrap();
        assert_ne!(hash_v1, hash_v2);
    }

    #[test]
    fn hash_depends_on_prev_hash() {
        let event = sample_event(1);
        let left = event_hash(&"a".repeat(64), &event).unwrap();
        let right = event_hash(&"b".repeat(64), &event).unwrap();
        assert_ne!(left, right);
    }

    #[test]
    fn mixed_version_chain_verifies() {
        let mut records = Vec::new();
        let mut prev = GENESIS_PREV_HASH.to_string();
        for seq in 0 .. 4u64 {
            let mut event = sample_event(seq);
            if seq >= 2 {
                event.meta.hash_version = Some(HashVersion::V2);
            }
            let record = seal_record(&prev, event).unwrap();
            prev = record.event_hash.clone();
            records.push(record);
        }
        verify_chain(&records).unwrap();
    }

    #[test]
    fn tampered_payload_is_detected_at_next_link() {
        let mut records = Vec::new();
        let mut prev = GENESIS_PREV_HASH.to_string();
        for seq in 0 .. 3u64 {
            let record = seal_record(&prev, sample_event(seq)).unwrap();
            prev = record.event_hash.clone();
            records.push(record);
        }
        records[1].event.payload = json!({"inc": 2});
        let err = verify_chain(&records).unwrap_err();
        assert!(matches!(err, super::ChainError::BrokenLink { seq: 2 }));
    }

    #[test]
    fn tampered_tail_record_is_detected() {
        let mut records = Vec::new();
        let mut prev = GENESIS_PREV_HASH.to_string();
        for seq in 0 .. 3u64 {
            let record = seal_record(&prev, sample_event(seq)).unwrap();
            prev = record.event_hash.clone();
            records.push(record);
        }
        records[2].event.payload = json!({"inc": 2});
        let err = verify_chain(&records).unwrap_err();
        assert!(matches!(err, super::ChainError::HashMismatch { seq: 2 }));
    }

    #[test]
    fn duplicate_seq_is_detected() {
        let first = seal_record(GENESIS_PREV_HASH, sample_event(0)).unwrap();
        let duplicate = first.clone();
        let err = verify_chain(&[first, duplicate]).unwrap_err();
        assert!(matches!(err, super::ChainError::DuplicateSeq { seq: 0 }));
    }

    #[test]
    fn genesis_must_carry_zero_prev_hash() {
        let record = seal_record(&"9".repeat(64), sample_event(0)).unwrap();
        let err = verify_chain(&[record]).unwrap_err();
        assert!(matches!(err, super::ChainError::BrokenLink { seq: 0 }));
    }

    #[test]
    fn gap_is_detected() {
        let first = seal_record(GENESIS_PREV_HASH, sample_event(0)).unwrap();
        let third = seal_record(&first.event_hash, sample_event(2)).unwrap();
        let err = verify_chain(&[first, third]).unwrap_err();
        assert!(matches!(err, super::ChainError::SequenceGap { expected: 1, found: 2 }));
    }
}
