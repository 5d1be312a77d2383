// crates/agent-ledger-core/src/lib.rs
// ============================================================================
// Module: Agent Ledger Core
// Description: Deterministic kernel for the event-sourced reconciliation engine.
// Purpose: Provide canonical hashing, the event/state model, the reducer, the
// decision layer, replay, checkpoints, and the event-store contract.
// Dependencies: ed25519-dalek, rand, serde, serde_jcs, serde_json, sha2, thiserror
// ============================================================================

//! ## Overview
//! Agent Ledger core contains everything required to make reconciliation
//! decisions replayable and verifiable: a canonical serializer that is the
//! single source of hash input, a deterministic clock, an immutable event and
//! state model, a pure reducer, the hash chain binding each event to its
//! predecessor, and the abstract event-store contract that backends implement.
//!
//! The kernel is strictly synchronous and free of wall-clock reads, randomness,
//! and I/O. The only exceptions live in the store layer (`append_with_retry`
//! sleeps between attempts); backends own all real I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use core::action::Action;
pub use core::action::ActionType;
pub use core::canonical::CanonicalError;
pub use core::canonical::canonical_bytes;
pub use core::canonical::hash_canonical;
pub use core::canonical::sha256_hex;
pub use core::chain::ChainError;
pub use core::chain::GENESIS_PREV_HASH;
pub use core::chain::HashVersion;
pub use core::chain::event_hash;
pub use core::chain::seal_record;
pub use core::chain::verify_chain;
pub use core::checkpoint::Checkpoint;
pub use core::checkpoint::CheckpointBundle;
pub use core::checkpoint::CheckpointError;
pub use core::clock::LogicalClock;
pub use core::event::EVENT_ACTION_APPLIED;
pub use core::event::EVENT_ACTIONS_DECIDED;
pub use core::event::EVENT_AGENT_DEPARTED;
pub use core::event::EVENT_AGENT_OBSERVED;
pub use core::event::Event;
pub use core::event::EventDraft;
pub use core::event::EventMeta;
pub use core::event::LogRecord;
pub use core::ids::AggregateId;
pub use core::ids::FencingToken;
pub use core::ids::WriterId;
pub use core::ids::stable_id;
pub use core::state::NS_ACTIONS;
pub use core::state::NS_AGENTS;
pub use core::state::NS_DECISIONS;
pub use core::state::State;
pub use interfaces::BackendError;
pub use interfaces::EventStore;
pub use interfaces::MemoryEventStore;
pub use interfaces::StoreError;
pub use interfaces::Tail;
pub use interfaces::retry::RetryError;
pub use interfaces::retry::RetryPolicy;
pub use interfaces::retry::append_with_retry;
pub use interfaces::telemetry::NoopTelemetry;
pub use interfaces::telemetry::StoreMetric;
pub use interfaces::telemetry::StoreTelemetry;
pub use runtime::decide::DecideError;
pub use runtime::decide::Decision;
pub use runtime::decide::DecisionMeta;
pub use runtime::decide::decide;
pub use runtime::decide::decision_event;
pub use runtime::reducer::Handler;
pub use runtime::reducer::ReduceError;
pub use runtime::reducer::Reducer;
pub use runtime::replay::ReplayError;
pub use runtime::replay::StateDiffEntry;
pub use runtime::replay::TraceEntry;
pub use runtime::replay::diff_states;
pub use runtime::replay::replay;
pub use runtime::replay::replay_events;
pub use runtime::replay::replay_from_checkpoint;
pub use runtime::replay::trace;
