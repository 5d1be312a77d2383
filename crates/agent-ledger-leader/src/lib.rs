// crates/agent-ledger-leader/src/lib.rs
// ============================================================================
// Module: Agent Ledger Leader Gate
// Description: Single-writer discipline over a coordination-store lease.
// Purpose: Reduce append races and attribute every event to a leadership epoch.
// Dependencies: agent-ledger-core, serde, thiserror
// ============================================================================

//! ## Overview
//! The leader gate wraps every append and every executor side effect. A
//! replica acquires a lease in the platform's coordination store, checks
//! holdership before acting, re-confirms after acting, and suppresses side
//! effects for one full lease duration after losing the lease so its overlap
//! window with the successor stays small.
//!
//! Split-brain is mitigated and made forensically analyzable, not prevented:
//! the fencing token embedded in event metadata attributes each event to an
//! epoch, while the store-side conditional append remains the authoritative
//! protection against two writers colliding on the same sequence number.
//!
//! Time never comes from the wall clock inside the gate; every operation
//! takes `now_ms` from the caller, which keeps failover scenarios scriptable
//! in tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod gate;
pub mod lease;
pub mod writer;

pub use gate::GateState;
pub use gate::LeaderError;
pub use gate::LeaderGate;
pub use gate::LeaseTimings;
pub use lease::InMemoryLease;
pub use lease::LeaseApi;
pub use lease::LeaseError;
pub use lease::LeaseGrant;
pub use writer::GatedWriter;
pub use writer::WriterError;
