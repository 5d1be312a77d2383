// crates/agent-ledger-store-object/src/lib.rs
// ============================================================================
// Module: Agent Ledger Object Store
// Description: One-object-per-event backend over S3-compatible storage.
// Purpose: Provide multi-host durable storage with conditional-create appends.
// Dependencies: agent-ledger-core, aws-config, aws-sdk-s3, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! Every event lives at `{prefix}/{seq:010}.json`; ten-digit zero padding
//! makes lexicographic key order equal numeric order. Appends are conditional
//! creates (`If-None-Match: *`): whichever writer creates the key first wins,
//! and the loser observes a conflict and retries behind it. A cached head
//! object keeps the common path O(1); it is only ever a hint and is
//! cross-checked against the backing store whenever it looks stale.
//!
//! The store presents a synchronous facade over a privately owned tokio
//! runtime, so callers stay straight-line synchronous code.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod keys;
pub mod store;

pub use keys::event_key;
pub use keys::head_key;
pub use keys::normalize_prefix;
pub use keys::seq_from_key;
pub use store::ObjectEventStore;
pub use store::ObjectStoreConfig;
