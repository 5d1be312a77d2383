// crates/agent-ledger-core/src/interfaces/memory.rs
// ============================================================================
// Module: In-Memory Event Store
// Description: Reference EventStore used by tests and embedded verifiers.
// Purpose: Provide executable append/read/tail semantics without I/O.
// Dependencies: crate::core, crate::interfaces, std::sync
// ============================================================================

//! ## Overview
//! The memory store is the reference implementation of the store contract:
//! conditional append keyed on the tail hash, chain-validating reads, and an
//! O(1) tail. Backends must behave observably identically. The store is
//! thread-safe so concurrent-writer races can be exercised in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use crate::core::chain::seal_record;
use crate::core::chain::verify_chain;
use crate::core::event::EventDraft;
use crate::core::event::LogRecord;
use crate::interfaces::BackendError;
use crate::interfaces::EventStore;
use crate::interfaces::StoreError;
use crate::interfaces::Tail;

// ============================================================================
// SECTION: Memory Store
// ============================================================================

/// Thread-safe in-memory event store.
///
/// # Invariants
/// - Records are stored in sequence order; `records[n].event.seq == n`.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    /// Append-only record vector guarded for concurrent writers.
    records: Mutex<Vec<LogRecord>>,
}

impl MemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the internal lock is poisoned.
    pub fn len(&self) -> Result<u64, StoreError> {
        let records = self.lock()?;
        Ok(records.len() as u64)
    }

    /// Returns true when the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the internal lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Acquires the record lock, mapping poisoning to a backend error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<LogRecord>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Backend(BackendError::Io("store lock poisoned".to_string())))
    }
}

impl EventStore for MemoryEventStore {
    fn append(
        &self,
        draft: EventDraft,
        expected_prev_hash: &str,
    ) -> Result<LogRecord, StoreError> {
        let mut records = self.lock()?;
        let tail_hash = records
            .last()
            .map_or_else(|| Tail::empty().last_event_hash, |last| last.event_hash.clone());
        if tail_hash != expected_prev_hash {
            return Err(StoreError::Conflict { expected: expected_prev_hash.to_string() });
        }
        let seq = records.len() as u64;
        let event = draft.into_event(seq);
        let record = seal_record(&tail_hash, event)
            .map_err(|err| StoreError::from_chain(&err))?;
        records.push(record.clone());
        Ok(record)
    }

    fn read(&self, from_seq: u64, to_seq: Option<u64>) -> Result<Vec<LogRecord>, StoreError> {
        let records = self.lock()?;
        let window: Vec<LogRecord> = records
            .iter()
            .filter(|record| {
                record.event.seq >= from_seq && to_seq.is_none_or(|end| record.event.seq <= end)
            })
            .cloned()
            .collect();
        verify_chain(&window).map_err(|err| StoreError::from_chain(&err))?;
        Ok(window)
    }

    fn tail(&self) -> Result<Tail, StoreError> {
        let records = self.lock()?;
        Ok(records.last().map_or_else(Tail::empty, |last| Tail {
            last_seq: Some(last.event.seq),
            last_event_hash: last.event_hash.clone(),
        }))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use serde_json::json;

    use super::MemoryEventStore;
    use crate::core::chain::GENESIS_PREV_HASH;
    use crate::core::event::EventDraft;
    use crate::core::ids::AggregateId;
    use crate::interfaces::EventStore;
    use crate::interfaces::StoreError;

    /// Builds an `INC` draft at the given timestamp.
    fn draft(ts: u64) -> EventDraft {
        EventDraft::new("INC", AggregateId::new("A"), ts, json!({"inc": 1}))
    }

    #[test]
    fn append_assigns_contiguous_seqs() {
        let store = MemoryEventStore::new();
        let first = store.append(draft(1), GENESIS_PREV_HASH).unwrap();
        let second = store.append(draft(2), &first.event_hash).unwrap();
        assert_eq!(first.event.seq, 0);
        assert_eq!(second.event.seq, 1);
        assert_eq!(second.prev_hash, first.event_hash);
    }

    #[test]
    fn stale_precondition_conflicts_without_mutation() {
        let store = MemoryEventStore::new();
        let first = store.append(draft(1), GENESIS_PREV_HASH).unwrap();
        let err = store.append(draft(2), GENESIS_PREV_HASH).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.tail().unwrap().last_event_hash, first.event_hash);
    }

    #[test]
    fn read_window_is_inclusive() {
        let store = MemoryEventStore::new();
        let mut prev = GENESIS_PREV_HASH.to_string();
        for ts in 1 ..= 5u64 {
            prev = store.append(draft(ts), &prev).unwrap().event_hash;
        }
        let window = store.read(1, Some(3)).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].event.seq, 1);
        assert_eq!(window[2].event.seq, 3);
    }

    #[test]
    fn empty_tail_is_genesis() {
        let store = MemoryEventStore::new();
        let tail = store.tail().unwrap();
        assert_eq!(tail.last_seq, None);
        assert_eq!(tail.last_event_hash, GENESIS_PREV_HASH);
        assert_eq!(tail.next_seq(), 0);
    }
}
