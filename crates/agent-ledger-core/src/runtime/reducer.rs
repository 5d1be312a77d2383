// crates/agent-ledger-core/src/runtime/reducer.rs
// ============================================================================
// Module: Reducer
// Description: Pure (state, event) -> state dispatcher keyed by event type.
// Purpose: Fold the event log into derived state with no side channels.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The reducer is a registry of pure handlers. Handlers never perform I/O,
//! never read clocks or process state, and never mutate their inputs; they
//! return a new state shaped through [`State::set_aggregate`]. The reducer
//! itself owns the version bump: every reduced event advances `version` by
//! exactly one, including events with no registered handler (unknown types
//! are forward-compatible no-ops).
//!
//! Malformed events are fatal. The reducer validates shape before dispatch
//! and never attempts recovery; a malformed event in the log is an integrity
//! problem for operators, not something to paper over.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::event::EVENT_ACTION_APPLIED;
use crate::core::event::EVENT_ACTIONS_DECIDED;
use crate::core::event::EVENT_AGENT_DEPARTED;
use crate::core::event::EVENT_AGENT_OBSERVED;
use crate::core::event::Event;
use crate::core::ids::AggregateId;
use crate::core::state::NS_ACTIONS;
use crate::core::state::NS_AGENTS;
use crate::core::state::NS_DECISIONS;
use crate::core::state::State;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Reducer errors. All variants indicate programming or log-integrity bugs.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ReduceError {
    /// The event carries an empty type identifier.
    #[error("malformed event at seq {seq}: empty type")]
    EmptyType {
        /// Sequence number of the malformed event.
        seq: u64,
    },
    /// The event's sequence does not continue the state's fold count.
    #[error("sequence mismatch: state at version {version}, event seq {seq}")]
    SequenceMismatch {
        /// Fold count of the input state.
        version: u64,
        /// Sequence number of the rejected event.
        seq: u64,
    },
    /// A handler found the event payload structurally invalid.
    #[error("malformed payload for {event_type} at seq {seq}: {detail}")]
    MalformedPayload {
        /// Event type whose handler rejected the payload.
        event_type: String,
        /// Sequence number of the malformed event.
        seq: u64,
        /// Human-readable diagnostic.
        detail: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Pure event handler: shapes aggregates, never bumps the version.
pub type Handler = fn(&State, &Event) -> Result<State, ReduceError>;

/// Registry mapping event type strings to pure handlers.
///
/// # Invariants
/// - The registry is a value passed explicitly through the call graph; there
///   is no process-wide default.
#[derive(Debug, Clone, Default)]
pub struct Reducer {
    /// Event type → handler.
    handlers: BTreeMap<String, Handler>,
}

impl Reducer {
    /// Creates an empty reducer with no registered handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the engine reducer with the built-in handler set.
    #[must_use]
    pub fn engine() -> Self {
        let mut reducer = Self::new();
        reducer.register(EVENT_AGENT_OBSERVED, reduce_agent_observed);
        reducer.register(EVENT_AGENT_DEPARTED, reduce_agent_departed);
        reducer.register(EVENT_ACTIONS_DECIDED, reduce_actions_decided);
        reducer.register(EVENT_ACTION_APPLIED, reduce_action_applied);
        reducer
    }

    /// Registers a handler for an event type, replacing any previous one.
    pub fn register(&mut self, event_type: impl Into<String>, handler: Handler) {
        self.handlers.insert(event_type.into(), handler);
    }

    /// Folds one event into the state.
    ///
    /// Unknown event types are no-ops that still bump the version.
    ///
    /// # Errors
    ///
    /// Returns [`ReduceError`] when the event is malformed or out of
    /// sequence. The reducer never attempts recovery.
    pub fn reduce(&self, state: &State, event: &Event) -> Result<State, ReduceError> {
        if event.event_type.is_empty() {
            return Err(ReduceError::EmptyType { seq: event.seq });
        }
        if event.seq != state.version() {
            return Err(ReduceError::SequenceMismatch {
                version: state.version(),
                seq: event.seq,
            });
        }
        let next = match self.handlers.get(&event.event_type) {
            Some(handler) => handler(state, event)?,
            None => state.clone(),
        };
        Ok(next.bumped())
    }
}

// ============================================================================
// SECTION: Built-In Handlers
// ============================================================================

/// Upserts the observed agent aggregate.
fn reduce_agent_observed(state: &State, event: &Event) -> Result<State, ReduceError> {
    let spec = event.payload.get("spec").cloned().ok_or_else(|| {
        ReduceError::MalformedPayload {
            event_type: event.event_type.clone(),
            seq: event.seq,
            detail: "missing spec".to_string(),
        }
    })?;
    let mut aggregate = Map::new();
    if let Some(name) = event.payload.get("name").cloned() {
        aggregate.insert("name".to_string(), name);
    }
    if let Some(namespace) = event.payload.get("namespace").cloned() {
        aggregate.insert("namespace".to_string(), namespace);
    }
    aggregate.insert("phase".to_string(), Value::String("observed".to_string()));
    aggregate.insert("spec".to_string(), spec);
    aggregate.insert("last_seq".to_string(), Value::from(event.seq));
    Ok(state.set_aggregate(NS_AGENTS, &event.aggregate_id, Value::Object(aggregate)))
}

/// Marks an agent aggregate as departed.
fn reduce_agent_departed(state: &State, event: &Event) -> Result<State, ReduceError> {
    let mut aggregate = state
        .get_aggregate(NS_AGENTS, &event.aggregate_id)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    aggregate.insert("phase".to_string(), Value::String("departed".to_string()));
    aggregate.insert("last_seq".to_string(), Value::from(event.seq));
    Ok(state.set_aggregate(NS_AGENTS, &event.aggregate_id, Value::Object(aggregate)))
}

/// Records decision provenance for the triggering event.
fn reduce_actions_decided(state: &State, event: &Event) -> Result<State, ReduceError> {
    let trigger_seq = event.payload.get("trigger_seq").and_then(Value::as_u64).ok_or_else(
        || ReduceError::MalformedPayload {
            event_type: event.event_type.clone(),
            seq: event.seq,
            detail: "missing trigger_seq".to_string(),
        },
    )?;
    let mut aggregate = Map::new();
    aggregate.insert("trigger_seq".to_string(), Value::from(trigger_seq));
    if let Some(actions_hash) = event.payload.get("actions_hash").cloned() {
        aggregate.insert("actions_hash".to_string(), actions_hash);
    }
    if let Some(action_ids) = event.payload.get("action_ids").cloned() {
        aggregate.insert("action_ids".to_string(), action_ids);
    }
    aggregate.insert("decided_seq".to_string(), Value::from(event.seq));
    Ok(state.set_aggregate(NS_DECISIONS, &event.aggregate_id, Value::Object(aggregate)))
}

/// Records the applied outcome fed back by the executor.
fn reduce_action_applied(state: &State, event: &Event) -> Result<State, ReduceError> {
    let action_id = event.payload.get("action_id").and_then(Value::as_str).ok_or_else(
        || ReduceError::MalformedPayload {
            event_type: event.event_type.clone(),
            seq: event.seq,
            detail: "missing action_id".to_string(),
        },
    )?;
    let mut aggregate = Map::new();
    if let Some(target) = event.payload.get("target").cloned() {
        aggregate.insert("target".to_string(), target);
    }
    if let Some(outcome) = event.payload.get("outcome").cloned() {
        aggregate.insert("outcome".to_string(), outcome);
    }
    aggregate.insert("applied_seq".to_string(), Value::from(event.seq));
    let id = AggregateId::new(action_id);
    Ok(state.set_aggregate(NS_ACTIONS, &id, Value::Object(aggregate)))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use serde_json::json;

    use super::ReduceError;
    use super::Reducer;
    use crate::core::event::Event;
    use crate::core::event::EventMeta;
    use crate::core::ids::AggregateId;
    use crate::core::state::NS_AGENTS;
    use crate::core::state::State;

    /// Builds an event for the fixed test aggregate.
    fn event(event_type: &str, seq: u64, payload: serde_json::Value) -> Event {
        Event {
            event_type: event_type.to_string(),
            aggregate_id: AggregateId::new("agent-1"),
            seq,
            ts: seq + 1,
            payload,
            meta: EventMeta::default(),
        }
    }

    #[test]
    fn unknown_type_is_noop_that_bumps_version() {
        let reducer = Reducer::engine();
        let state = State::initial();
        let next = reducer.reduce(&state, &event("SomethingNew", 0, json!({}))).unwrap();
        assert_eq!(next.version(), 1);
        assert_eq!(next.aggregates().len(), 0);
    }

    #[test]
    fn empty_type_is_fatal() {
        let reducer = Reducer::engine();
        let err = reducer.reduce(&State::initial(), &event("", 0, json!({}))).unwrap_err();
        assert!(matches!(err, ReduceError::EmptyType { seq: 0 }));
    }

    #[test]
    fn out_of_sequence_event_is_fatal() {
        let reducer = Reducer::engine();
        let err = reducer
            .reduce(&State::initial(), &event("AgentObserved", 3, json!({"spec": {}})))
            .unwrap_err();
        assert!(matches!(err, ReduceError::SequenceMismatch { version: 0, seq: 3 }));
    }

    #[test]
    fn observed_then_departed_updates_phase() {
        let reducer = Reducer::engine();
        let state = State::initial();
        let observed = event(
            "AgentObserved",
            0,
            json!({"name": "w0", "namespace": "default", "spec": {"role": "worker"}}),
        );
        let state = reducer.reduce(&state, &observed).unwrap();
        let departed = event("AgentDeparted", 1, json!({"name": "w0"}));
        let state = reducer.reduce(&state, &departed).unwrap();
        let aggregate =
            state.get_aggregate(NS_AGENTS, &AggregateId::new("agent-1")).unwrap();
        assert_eq!(aggregate.get("phase"), Some(&json!("departed")));
        assert_eq!(state.version(), 2);
    }

    #[test]
    fn input_state_is_never_mutated() {
        let reducer = Reducer::engine();
        let state = State::initial();
        let observed = event("AgentObserved", 0, json!({"spec": {"role": "worker"}}));
        let _next = reducer.reduce(&state, &observed).unwrap();
        assert_eq!(state.version(), 0);
        assert!(state.get_aggregate(NS_AGENTS, &AggregateId::new("agent-1")).is_none());
    }
}
