// crates/agent-ledger-core/src/runtime/replay.rs
// ============================================================================
// Module: Replay Runner
// Description: Fold events through the reducer; diff and trace helpers.
// Purpose: Reconstruct state deterministically for decisions and audits.
// Dependencies: crate::core, crate::interfaces, serde, thiserror
// ============================================================================

//! ## Overview
//! Replay folds the reducer over a validated read of the log. For any prefix,
//! the resulting state hash is identical across runs, hosts, and
//! implementations; that property is what every verifier leans on. Partial
//! replay (`to_seq`) supports audits; checkpoint-seeded replay skips genesis
//! for long logs after the bundle is verified.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::canonical::CanonicalError;
use crate::core::checkpoint::CheckpointBundle;
use crate::core::checkpoint::CheckpointError;
use crate::core::event::LogRecord;
use crate::core::state::State;
use crate::interfaces::EventStore;
use crate::interfaces::StoreError;
use crate::runtime::reducer::ReduceError;
use crate::runtime::reducer::Reducer;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Replay errors.
///
/// # Invariants
/// - Integrity failures from the store propagate unchanged.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The store surfaced an error while reading.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The reducer rejected an event.
    #[error(transparent)]
    Reduce(#[from] ReduceError),
    /// A checkpoint bundle failed verification before seeding replay.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    /// State hashing failed while producing a trace or diff.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

// ============================================================================
// SECTION: Replay
// ============================================================================

/// Replays the log from genesis up to `to_seq` (inclusive; `None` = tail).
///
/// # Errors
///
/// Returns [`ReplayError`] when the read fails validation or the reducer
/// rejects an event.
pub fn replay(
    store: &dyn EventStore,
    reducer: &Reducer,
    to_seq: Option<u64>,
) -> Result<State, ReplayError> {
    let records = store.read(0, to_seq)?;
    replay_events(&records, reducer)
}

/// Folds an already-read, chain-validated record slice into a state.
///
/// # Errors
///
/// Returns [`ReplayError::Reduce`] when the reducer rejects an event.
pub fn replay_events(records: &[LogRecord], reducer: &Reducer) -> Result<State, ReplayError> {
    let mut state = State::initial();
    for record in records {
        state = reducer.reduce(&state, &record.event)?;
    }
    Ok(state)
}

/// Replays from a verified checkpoint bundle, folding only the tail.
///
/// The bundle must already have passed signature verification against the
/// trusted key; this function re-checks the state hash and then applies
/// events strictly after `checkpoint.at_seq`.
///
/// # Errors
///
/// Returns [`ReplayError::Checkpoint`] when the bundled state does not match
/// its commitment, plus any store or reducer error from the tail fold.
pub fn replay_from_checkpoint(
    store: &dyn EventStore,
    reducer: &Reducer,
    bundle: &CheckpointBundle,
    to_seq: Option<u64>,
) -> Result<State, ReplayError> {
    let state_hash = bundle.state.state_hash()?;
    if state_hash != bundle.checkpoint.state_hash {
        return Err(ReplayError::Checkpoint(CheckpointError::StateHashMismatch {
            at_seq: bundle.checkpoint.at_seq,
        }));
    }
    let mut state = bundle.state.clone();
    let records = store.read(bundle.checkpoint.at_seq + 1, to_seq)?;
    for record in &records {
        state = reducer.reduce(&state, &record.event)?;
    }
    Ok(state)
}

// ============================================================================
// SECTION: Diff Helper
// ============================================================================

/// One field-level difference between two states.
///
/// # Invariants
/// - `left`/`right` are `None` when the aggregate is absent on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDiffEntry {
    /// Aggregate namespace.
    pub namespace: String,
    /// Aggregate identifier.
    pub aggregate_id: String,
    /// Value on the left side, if present.
    pub left: Option<Value>,
    /// Value on the right side, if present.
    pub right: Option<Value>,
}

/// Compares two states aggregate-by-aggregate.
///
/// Entries are emitted in deterministic namespace/id order; equal aggregates
/// produce no entry. A version difference alone produces no entry; callers
/// compare `version()` directly.
#[must_use]
pub fn diff_states(left: &State, right: &State) -> Vec<StateDiffEntry> {
    let mut entries = Vec::new();
    let mut namespaces: Vec<&String> = left.aggregates().keys().collect();
    for namespace in right.aggregates().keys() {
        if !namespaces.contains(&namespace) {
            namespaces.push(namespace);
        }
    }
    namespaces.sort();
    for namespace in namespaces {
        let left_bucket = left.aggregates().get(namespace);
        let right_bucket = right.aggregates().get(namespace);
        let mut ids: Vec<&String> =
            left_bucket.map(|bucket| bucket.keys().collect::<Vec<_>>()).unwrap_or_default();
        if let Some(bucket) = right_bucket {
            for id in bucket.keys() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        for id in ids {
            let left_value = left_bucket.and_then(|bucket| bucket.get(id));
            let right_value = right_bucket.and_then(|bucket| bucket.get(id));
            if left_value != right_value {
                entries.push(StateDiffEntry {
                    namespace: namespace.clone(),
                    aggregate_id: id.clone(),
                    left: left_value.cloned(),
                    right: right_value.cloned(),
                });
            }
        }
    }
    entries
}

// ============================================================================
// SECTION: Trace Helper
// ============================================================================

/// One step of a replay trace.
///
/// # Invariants
/// - `pre_hash`/`post_hash` are canonical state hashes around the fold step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Sequence number of the folded event.
    pub seq: u64,
    /// Event type of the folded event.
    pub event_type: String,
    /// Aggregate the event addressed.
    pub aggregate_id: String,
    /// State hash before the fold step.
    pub pre_hash: String,
    /// State hash after the fold step.
    pub post_hash: String,
}

/// Folds records while emitting a per-step hash trace.
///
/// # Errors
///
/// Returns [`ReplayError`] when a fold step or state hashing fails.
pub fn trace(records: &[LogRecord], reducer: &Reducer) -> Result<Vec<TraceEntry>, ReplayError> {
    let mut state = State::initial();
    let mut entries = Vec::with_capacity(records.len());
    for record in records {
        let pre_hash = state.state_hash()?;
        state = reducer.reduce(&state, &record.event)?;
        let post_hash = state.state_hash()?;
        entries.push(TraceEntry {
            seq: record.event.seq,
            event_type: record.event.event_type.clone(),
            aggregate_id: record.event.aggregate_id.as_str().to_string(),
            pre_hash,
            post_hash,
        });
    }
    Ok(entries)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
