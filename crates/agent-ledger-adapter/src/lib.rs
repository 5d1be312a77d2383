// crates/agent-ledger-adapter/src/lib.rs
// ============================================================================
// Module: Agent Ledger Adapter
// Description: Translate observed platform objects into canonical events.
// Purpose: Collapse observation noise so identical specs yield identical events.
// Dependencies: agent-ledger-core, bigdecimal, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The adapter is the canonicalization boundary between the orchestration
//! platform and the ledger. It strips platform-assigned fields, materializes
//! a frozen set of defaults, normalizes enumerated fields and resource
//! quantities, and emits event drafts whose payloads hash identically for
//! semantically identical observations.
//!
//! Floats and host-local fields are rejected here, never deeper in the
//! engine: the reducer and decision layer only ever see canonical payloads.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod defaults;
pub mod observe;
pub mod quantity;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use defaults::DEFAULT_ROLE;
pub use defaults::DEFAULT_WORKSPACE_CLASS;
pub use defaults::DEFAULT_WORKSPACE_SIZE;
pub use defaults::default_image_for_role;
pub use observe::AdapterError;
pub use observe::ObservedObject;
pub use observe::observe;
pub use observe::observe_departure;
pub use quantity::QuantityError;
pub use quantity::quantity_to_bytes;
