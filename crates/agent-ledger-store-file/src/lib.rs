// crates/agent-ledger-store-file/src/lib.rs
// ============================================================================
// Module: Agent Ledger File Store
// Description: JSONL segment backend with fsync, rotation, and advisory locks.
// Purpose: Provide durable single-host storage for the event log.
// Dependencies: agent-ledger-core, fs2, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each log segment is a file of newline-delimited JSON records, one per
//! event, written with `fsync` after every record. Segments rotate at a
//! configured byte threshold; the first record of a new segment chains onto
//! the last record of the previous one, so verification never notices the
//! boundary.
//!
//! An exclusive advisory lock on the ledger directory serializes local
//! writers. Cross-host single-writer discipline is the leader gate's job;
//! the lock only protects against two processes on one machine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

pub use store::FileEventStore;
pub use store::FileStoreConfig;
