// crates/agent-ledger-core/src/core/event.rs
// ============================================================================
// Module: Event Model
// Description: Immutable event records, drafts, metadata, and log records.
// Purpose: Define the append-only units of truth stored in the ledger.
// Dependencies: crate::core::{chain, ids}, serde, serde_json
// ============================================================================

//! ## Overview
//! An [`Event`] is produced once, appended once, and never mutated. Drafts
//! carry everything except the sequence number, which the store assigns at
//! append time. The stored wrapper, [`LogRecord`], binds each event into the
//! hash chain via `prev_hash` and `event_hash`.
//!
//! Forward compatibility: unknown optional fields inside `meta` are preserved
//! (and hashed) but never interpreted; the record wrapper itself rejects
//! unknown fields because its shape is part of the wire contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::chain::HashVersion;
use crate::core::ids::AggregateId;
use crate::core::ids::FencingToken;
use crate::core::ids::WriterId;

// ============================================================================
// SECTION: Event Type Names
// ============================================================================

/// Event type emitted when an agent workload is observed on the platform.
pub const EVENT_AGENT_OBSERVED: &str = "AgentObserved";
/// Event type emitted when an observed agent workload disappears.
pub const EVENT_AGENT_DEPARTED: &str = "AgentDeparted";
/// Event type carrying decision provenance for a trigger.
pub const EVENT_ACTIONS_DECIDED: &str = "ActionsDecided";
/// Event type fed back by the executor after applying an action.
pub const EVENT_ACTION_APPLIED: &str = "ActionApplied";

// ============================================================================
// SECTION: Event Metadata
// ============================================================================

/// Auxiliary event metadata.
///
/// # Invariants
/// - All fields are optional; an empty meta canonicalizes to `{}` under hash
///   version v1 and is omitted from the hash input under v2.
/// - Unknown optional fields are preserved in `extra` for forward-compatible
///   reads and participate in hashing unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Writer identity for the appending replica.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writer_id: Option<WriterId>,
    /// Hash version marker; absence selects v1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_version: Option<HashVersion>,
    /// Forensic fencing token for the leadership epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fencing_token: Option<FencingToken>,
    /// Unknown optional fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EventMeta {
    /// Returns true when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writer_id.is_none()
            && self.hash_version.is_none()
            && self.fencing_token.is_none()
            && self.extra.is_empty()
    }

    /// Returns true when nothing besides the hash-version marker is set.
    ///
    /// Under hash version v2 the marker moves to the top level of the hash
    /// input, so a meta carrying only the marker counts as empty there.
    #[must_use]
    pub fn is_marker_only(&self) -> bool {
        self.writer_id.is_none() && self.fencing_token.is_none() && self.extra.is_empty()
    }

    /// Returns the hash version, defaulting to v1 when absent.
    #[must_use]
    pub fn effective_hash_version(&self) -> HashVersion {
        self.hash_version.unwrap_or(HashVersion::V1)
    }
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Immutable event record.
///
/// # Invariants
/// - `seq` is globally monotonic and gap-free within a single log.
/// - `ts` is a logical timestamp from the deterministic clock.
/// - `payload` contains no floating-point numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Short, namespace-qualified event type identifier.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque stable key identifying the subject.
    pub aggregate_id: AggregateId,
    /// Sequence number assigned by the store.
    pub seq: u64,
    /// Logical timestamp assigned at emission.
    pub ts: u64,
    /// Structured event payload.
    pub payload: Value,
    /// Auxiliary metadata.
    #[serde(default)]
    pub meta: EventMeta,
}

/// Event draft awaiting sequence assignment by the store.
///
/// # Invariants
/// - Identical to [`Event`] minus `seq`; the store finalizes the draft
///   exactly once on successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Short, namespace-qualified event type identifier.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Opaque stable key identifying the subject.
    pub aggregate_id: AggregateId,
    /// Logical timestamp assigned at emission.
    pub ts: u64,
    /// Structured event payload.
    pub payload: Value,
    /// Auxiliary metadata.
    #[serde(default)]
    pub meta: EventMeta,
}

impl EventDraft {
    /// Creates a draft with empty metadata.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        aggregate_id: AggregateId,
        ts: u64,
        payload: Value,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            aggregate_id,
            ts,
            payload,
            meta: EventMeta::default(),
        }
    }

    /// Finalizes the draft into an event at the given sequence number.
    #[must_use]
    pub fn into_event(self, seq: u64) -> Event {
        Event {
            event_type: self.event_type,
            aggregate_id: self.aggregate_id,
            seq,
            ts: self.ts,
            payload: self.payload,
            meta: self.meta,
        }
    }
}

// ============================================================================
// SECTION: Log Records
// ============================================================================

/// Stored wrapper binding an event into the hash chain.
///
/// # Invariants
/// - `prev_hash` is 64 hex chars; the genesis record carries 64 zeros.
/// - `event_hash` commits to the event under its declared hash version.
/// - The wire form has exactly these three fields, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogRecord {
    /// Hash of the predecessor record's event.
    pub prev_hash: String,
    /// Hash commitment to this record's event.
    pub event_hash: String,
    /// The embedded event.
    pub event: Event,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
