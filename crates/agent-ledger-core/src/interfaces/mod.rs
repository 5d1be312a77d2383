// crates/agent-ledger-core/src/interfaces/mod.rs
// ============================================================================
// Module: Store Interfaces
// Description: Backend-agnostic event-store contract and error taxonomy.
// Purpose: Define the surface backends implement and writers program against.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The event store is the only durable shared state in the engine. Backends
//! implement [`EventStore`]: an atomic conditional append, a chain-validating
//! read, and an O(1)-amortized tail. The error taxonomy separates integrity
//! failures (fatal for the affected read, never auto-repaired) from append
//! conflicts (retryable) and backend transport failures (classified for
//! operator response).
//!
//! Implementations must assume strong read-after-write consistency and
//! conditional-create semantics from their backing store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod memory;
pub mod retry;
pub mod telemetry;

pub use memory::MemoryEventStore;

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::canonical::CanonicalError;
use crate::core::chain::ChainError;
use crate::core::chain::GENESIS_PREV_HASH;
use crate::core::event::EventDraft;
use crate::core::event::LogRecord;

// ============================================================================
// SECTION: Tail
// ============================================================================

/// Current head indicator of a log.
///
/// # Invariants
/// - An empty log carries `last_seq == None` and the genesis previous hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tail {
    /// Sequence number of the last record, if any.
    pub last_seq: Option<u64>,
    /// `event_hash` of the last record, or the genesis hash when empty.
    pub last_event_hash: String,
}

impl Tail {
    /// Returns the tail of an empty log.
    #[must_use]
    pub fn empty() -> Self {
        Self { last_seq: None, last_event_hash: GENESIS_PREV_HASH.to_string() }
    }

    /// Returns the sequence number the next append will receive.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.last_seq.map_or(0, |seq| seq + 1)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport-layer failure classification.
///
/// # Invariants
/// - Variants are stable: they drive distinct operator responses
///   (credentials drift, capacity, transient network).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The store rejected the caller's credentials.
    #[error("backend access denied: {0}")]
    AccessDenied(String),
    /// The configured bucket or directory does not exist.
    #[error("backend location missing: {0}")]
    NoSuchBucket(String),
    /// A transient transport failure.
    #[error("backend network error: {0}")]
    Network(String),
    /// A local I/O failure.
    #[error("backend io error: {0}")]
    Io(String),
}

/// Event-store errors.
///
/// # Invariants
/// - `Conflict` is retryable; `Integrity` is fatal for the affected read and
///   never auto-repaired.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer advanced the log; the append precondition failed.
    #[error("append conflict: expected prev hash {expected}")]
    Conflict {
        /// Previous hash the caller expected at the tail.
        expected: String,
    },
    /// The stored chain is inconsistent: mismatch, gap, duplicate, or
    /// malformed record.
    #[error("integrity failure at seq {seq}: {detail}")]
    Integrity {
        /// Sequence number of the offending record.
        seq: u64,
        /// Human-readable diagnostic.
        detail: String,
    },
    /// Transport-layer failure, classified for operator response.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The event could not be canonicalized for hashing.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

impl StoreError {
    /// Maps a chain error discovered during a read into an integrity failure.
    #[must_use]
    pub fn from_chain(err: &ChainError) -> Self {
        let seq = match err {
            ChainError::HashMismatch { seq }
            | ChainError::BrokenLink { seq }
            | ChainError::DuplicateSeq { seq } => *seq,
            ChainError::SequenceGap { expected, .. } => *expected,
            ChainError::Canonical(_) => 0,
        };
        Self::Integrity { seq, detail: err.to_string() }
    }
}

// ============================================================================
// SECTION: Event Store Contract
// ============================================================================

/// Append-only, hash-chained event store.
///
/// Implementations serialize appends through a conditional create keyed on
/// the caller's expected previous hash; readers validate the chain as they
/// stream and surface the first offense as [`StoreError::Integrity`].
pub trait EventStore {
    /// Atomically appends a draft, conditional on the current tail hash.
    ///
    /// On success the store assigns the next sequence number, computes the
    /// hash commitment under the draft's declared hash version, and returns
    /// the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when another writer has advanced the
    /// log, [`StoreError::Integrity`] when the store-side state is
    /// inconsistent, and [`StoreError::Backend`] on transport failure.
    fn append(
        &self,
        draft: EventDraft,
        expected_prev_hash: &str,
    ) -> Result<LogRecord, StoreError>;

    /// Reads records in `[from_seq, to_seq]`, validating the chain.
    ///
    /// A `to_seq` of `None` reads to the tail. The range is inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Integrity`] on the first chain offense and
    /// [`StoreError::Backend`] on transport failure.
    fn read(&self, from_seq: u64, to_seq: Option<u64>) -> Result<Vec<LogRecord>, StoreError>;

    /// Returns the current tail in O(1) amortized time.
    ///
    /// Implementations may serve this from a cached head indicator that is
    /// rebuilt from the backing store when missing or suspect.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] on transport failure.
    fn tail(&self) -> Result<Tail, StoreError>;
}
