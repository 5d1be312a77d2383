// crates/agent-ledger-leader/src/writer.rs
// ============================================================================
// Module: Gated Writer
// Description: Leader-gated append path stamping writer identity and epoch.
// Purpose: Wrap every append in pre- and post-action leadership checks.
// Dependencies: crate::gate, agent-ledger-core, thiserror
// ============================================================================

//! ## Overview
//! The gated writer is the only component allowed to put events into the
//! log on a replica. Before appending it confirms local leadership and
//! stamps the draft's metadata with the writer identity, the configured hash
//! version, and the forensic fencing token; after appending it re-confirms
//! holdership. A record whose append survived but whose post-check failed is
//! reported to the caller for forensic flagging; the record itself is
//! already durable and the conditional append has already arbitrated the
//! race.
//!
//! A writer that appends a trigger also appends the matching decision under
//! the same epoch, which is what makes trigger/decision pairs attributable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use agent_ledger_core::EventDraft;
use agent_ledger_core::EventStore;
use agent_ledger_core::HashVersion;
use agent_ledger_core::LogRecord;
use agent_ledger_core::RetryError;
use agent_ledger_core::RetryPolicy;
use agent_ledger_core::append_with_retry;
use thiserror::Error;

use crate::gate::LeaderError;
use crate::gate::LeaderGate;
use crate::lease::LeaseApi;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gated append outcomes that are not plain success.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Leadership forbade the append before it started.
    #[error(transparent)]
    Leader(LeaderError),
    /// The append itself failed or timed out.
    #[error(transparent)]
    Append(#[from] RetryError),
    /// The append succeeded but holdership was lost before the post-check.
    ///
    /// The record is durable; it carries this epoch's fencing token and
    /// should be flagged for forensic review of the overlap window.
    #[error("appended seq {seq} but leadership was lost; record flagged")]
    AppendedThenLost {
        /// Sequence number of the durable record.
        seq: u64,
        /// The durable record.
        record: Box<LogRecord>,
    },
}

// ============================================================================
// SECTION: Gated Writer
// ============================================================================

/// Leader-gated writer over an event store.
///
/// # Invariants
/// - Every appended event's metadata carries `writer_id` and the epoch
///   fencing token of the leadership under which it was written.
#[derive(Debug)]
pub struct GatedWriter<'a, S: EventStore, L: LeaseApi> {
    /// Backing event store.
    store: &'a S,
    /// Leader gate for this replica.
    gate: &'a mut LeaderGate<L>,
    /// Hash version stamped into appended events.
    hash_version: HashVersion,
    /// Retry policy for conditional appends.
    retry: RetryPolicy,
}

impl<'a, S: EventStore, L: LeaseApi> GatedWriter<'a, S, L> {
    /// Creates a gated writer.
    #[must_use]
    pub fn new(
        store: &'a S,
        gate: &'a mut LeaderGate<L>,
        hash_version: HashVersion,
        retry: RetryPolicy,
    ) -> Self {
        Self { store, gate, hash_version, retry }
    }

    /// Appends a draft under leadership checks.
    ///
    /// Conflict retries run under the leadership belief checked at entry;
    /// a loss during the append is caught by the post-action check, which
    /// enters cooldown and stops any further writes from this replica.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError::Leader`] when the replica must not write,
    /// [`WriterError::Append`] when the store append fails, and
    /// [`WriterError::AppendedThenLost`] when the post-action check finds
    /// holdership gone after a durable append.
    pub fn append(
        &mut self,
        mut draft: EventDraft,
        now_ms: u64,
        deadline: Option<Duration>,
    ) -> Result<LogRecord, WriterError> {
        let token = self.gate.pre_action_check(now_ms).map_err(WriterError::Leader)?;
        draft.meta.writer_id = Some(self.gate.writer_id().clone());
        draft.meta.fencing_token = Some(token);
        draft.meta.hash_version = match self.hash_version {
            HashVersion::V1 => None,
            HashVersion::V2 => Some(HashVersion::V2),
        };

        let record = append_with_retry(self.store, &draft, self.retry, deadline)?;

        match self.gate.post_action_check(now_ms) {
            Ok(()) => Ok(record),
            Err(LeaderError::LostAfterAction { .. }) => Err(WriterError::AppendedThenLost {
                seq: record.event.seq,
                record: Box::new(record),
            }),
            Err(other) => Err(WriterError::Leader(other)),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
