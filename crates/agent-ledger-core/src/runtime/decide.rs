// crates/agent-ledger-core/src/runtime/decide.rs
// ============================================================================
// Module: Decision Layer
// Description: Pure policy from (state, trigger record) to ordered actions.
// Purpose: Derive intended side effects with verifiable provenance.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The decision layer is a pure function: no I/O, no environment reads, no
//! randomness, no wall clock. Inputs that influence actions are normalized
//! before use (roles lowercased; structured values already canonical from the
//! adapter). The output is a deduplicated action list sorted ascending by
//! `action_id`. Ties are impossible because the id is a content hash.
//!
//! Provenance: every decision carries a trigger pointer (`trigger_seq`,
//! `trigger_hash`) and an `actions_hash` over the ordered action ids. The
//! same writer that appended the trigger appends the resulting
//! `ActionsDecided` event, so verifiers can re-run the policy offline and
//! compare hashes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::core::action::Action;
use crate::core::action::ActionType;
use crate::core::canonical::CanonicalError;
use crate::core::canonical::hash_canonical;
use crate::core::clock::LogicalClock;
use crate::core::event::EVENT_ACTIONS_DECIDED;
use crate::core::event::EVENT_AGENT_DEPARTED;
use crate::core::event::EVENT_AGENT_OBSERVED;
use crate::core::event::EventDraft;
use crate::core::event::LogRecord;
use crate::core::state::NS_AGENTS;
use crate::core::state::State;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Decision layer errors. All variants indicate malformed trigger content.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum DecideError {
    /// The trigger payload is structurally invalid for its type.
    #[error("malformed trigger at seq {seq}: {detail}")]
    MalformedTrigger {
        /// Sequence number of the trigger event.
        seq: u64,
        /// Human-readable diagnostic.
        detail: String,
    },
    /// Canonicalization of action content failed.
    #[error("decision canonicalization failed: {0}")]
    Canonical(#[from] CanonicalError),
}

// ============================================================================
// SECTION: Decision Records
// ============================================================================

/// Decision provenance binding actions to their trigger.
///
/// # Invariants
/// - `trigger_hash` equals the `event_hash` of the record at `trigger_seq`.
/// - `actions_hash` is the hash of the canonicalized ordered action id list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMeta {
    /// Sequence number of the triggering event.
    pub trigger_seq: u64,
    /// `event_hash` of the triggering record.
    pub trigger_hash: String,
    /// Hash of the canonicalized ordered action id list.
    pub actions_hash: String,
    /// One action retained as an audit sample, when any were produced.
    pub sample_action: Option<Action>,
}

/// Complete decision output for one trigger.
///
/// # Invariants
/// - `actions` is deduplicated and sorted ascending by `action_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Ordered, deduplicated intended actions.
    pub actions: Vec<Action>,
    /// Provenance metadata for verification.
    pub meta: DecisionMeta,
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Derives the ordered action set for a trigger in the current state.
///
/// # Errors
///
/// Returns [`DecideError`] when the trigger payload is malformed or action
/// content cannot be canonicalized.
pub fn decide(state: &State, trigger: &LogRecord) -> Result<Decision, DecideError> {
    let raw = match trigger.event.event_type.as_str() {
        EVENT_AGENT_OBSERVED => observed_actions(trigger)?,
        EVENT_AGENT_DEPARTED => departed_actions(state, trigger)?,
        _ => Vec::new(),
    };
    let actions = order_actions(raw);
    let action_ids: Vec<Value> =
        actions.iter().map(|action| Value::String(action.action_id.clone())).collect();
    let actions_hash = hash_canonical(&Value::Array(action_ids))?;
    let meta = DecisionMeta {
        trigger_seq: trigger.event.seq,
        trigger_hash: trigger.event_hash.clone(),
        actions_hash,
        sample_action: actions.first().cloned(),
    };
    Ok(Decision { actions, meta })
}

/// Builds the `ActionsDecided` draft committing a decision to the log.
///
/// The draft targets the trigger's aggregate and must be appended by the same
/// writer, under the same leadership epoch, immediately after the trigger.
#[must_use]
pub fn decision_event(
    decision: &Decision,
    trigger: &LogRecord,
    clock: LogicalClock,
) -> (EventDraft, LogicalClock) {
    let (clock, ts) = clock.tick();
    let action_ids: Vec<Value> = decision
        .actions
        .iter()
        .map(|action| Value::String(action.action_id.clone()))
        .collect();
    let payload = json!({
        "trigger_seq": decision.meta.trigger_seq,
        "trigger_hash": decision.meta.trigger_hash,
        "actions_hash": decision.meta.actions_hash,
        "action_ids": Value::Array(action_ids),
    });
    let draft = EventDraft::new(
        EVENT_ACTIONS_DECIDED,
        trigger.event.aggregate_id.clone(),
        ts,
        payload,
    );
    (draft, clock)
}

// ============================================================================
// SECTION: Per-Trigger Policies
// ============================================================================

/// Actions for a freshly observed agent workload.
fn observed_actions(trigger: &LogRecord) -> Result<Vec<Action>, DecideError> {
    let spec = trigger.event.payload.get("spec").and_then(Value::as_object).ok_or_else(
        || DecideError::MalformedTrigger {
            seq: trigger.event.seq,
            detail: "missing spec object".to_string(),
        },
    )?;
    let role = normalized_role(spec);
    let agent = trigger.event.aggregate_id.as_str();
    let mut actions = Vec::new();

    let workspace = spec.get("workspace").and_then(Value::as_object);
    let size_bytes = workspace
        .and_then(|ws| ws.get("size_bytes"))
        .cloned()
        .unwrap_or_else(|| Value::String("1073741824".to_string()));
    let class = workspace
        .and_then(|ws| ws.get("class"))
        .cloned()
        .unwrap_or_else(|| Value::String("standard".to_string()));
    let mut workspace_params = Map::new();
    workspace_params.insert("size_bytes".to_string(), size_bytes);
    workspace_params.insert("class".to_string(), class);
    actions.push(Action::build(
        ActionType::ProvisionWorkspace,
        format!("workspace/{agent}"),
        Value::Object(workspace_params),
    )?);

    let mut sandbox_params = Map::new();
    sandbox_params.insert("role".to_string(), Value::String(role.clone()));
    if let Some(image) = spec.get("image").cloned() {
        sandbox_params.insert("image".to_string(), image);
    }
    actions.push(Action::build(
        ActionType::LaunchSandbox,
        format!("sandbox/{agent}"),
        Value::Object(sandbox_params),
    )?);

    if role == "controller" {
        let mut stream_params = Map::new();
        stream_params.insert("role".to_string(), Value::String(role));
        actions.push(Action::build(
            ActionType::AttachControlStream,
            format!("stream/{agent}"),
            Value::Object(stream_params),
        )?);
    }
    Ok(actions)
}

/// Actions for a departed agent workload.
fn departed_actions(state: &State, trigger: &LogRecord) -> Result<Vec<Action>, DecideError> {
    // A departure for an agent this log never observed needs no teardown.
    if state.get_aggregate(NS_AGENTS, &trigger.event.aggregate_id).is_none() {
        return Ok(Vec::new());
    }
    let agent = trigger.event.aggregate_id.as_str();
    Ok(vec![
        Action::build(ActionType::TeardownSandbox, format!("sandbox/{agent}"), json!({}))?,
        Action::build(ActionType::ReleaseWorkspace, format!("workspace/{agent}"), json!({}))?,
    ])
}

/// Lowercases the role field, defaulting to `worker`.
fn normalized_role(spec: &Map<String, Value>) -> String {
    spec.get("role")
        .and_then(Value::as_str)
        .map_or_else(|| "worker".to_string(), str::to_lowercase)
}

/// Sorts by action id and drops duplicates.
fn order_actions(mut actions: Vec<Action>) -> Vec<Action> {
    actions.sort_by(|left, right| left.action_id.cmp(&right.action_id));
    actions.dedup_by(|left, right| left.action_id == right.action_id);
    actions
}

// ============================================================================
// SECTION: Tests
// ============================================================================
