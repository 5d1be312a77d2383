// crates/agent-ledger-adapter/tests/decision_fixture.rs
// ============================================================================
// Module: Small Fixture Decision Proof
// Description: End-to-end golden test from observation to committed decision.
// ============================================================================
//! ## Overview
//! Feeds the canonical small fixture (one observed workload of role
//! `worker` with workspace size `1Gi`) through adapter, store, replay, and
//! decision layer, and pins the resulting identifiers and hashes to their
//! documented reference values. Any change to canonicalization, defaulting,
//! or policy shows up here first.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use agent_ledger_adapter::ObservedObject;
use agent_ledger_adapter::observe;
use agent_ledger_core::EventStore;
use agent_ledger_core::GENESIS_PREV_HASH;
use agent_ledger_core::LogicalClock;
use agent_ledger_core::MemoryEventStore;
use agent_ledger_core::Reducer;
use agent_ledger_core::decide;
use agent_ledger_core::decision_event;
use agent_ledger_core::replay;
use serde_json::Value;
use serde_json::json;

/// Reference aggregate id for `agent/default/w0`.
const REF_AGGREGATE_ID: &str =
    "a665a524170ba04021df6f38dc97ea6268d534ee69d5effe2432416f8ae743c5";
/// Reference action id for the launch-sandbox action.
const REF_LAUNCH_SANDBOX_ID: &str =
    "7e9a213c5f11f4b4adb5f50e9fba154ec4c0478487a3caad7f9dcff73651e42c";
/// Reference action id for the provision-workspace action.
const REF_PROVISION_WORKSPACE_ID: &str =
    "ad4dc0b2d1db9829ecd8eafb09155ce21a8beccaf0634f3d2888b8e1c2ff4f92";
/// Reference hash over the ordered action id list.
const REF_ACTIONS_HASH: &str =
    "6d72919d48b5715c160afaeb81d708d6e94197967c977afda10e9126840e660e";
/// Reference event hash of the trigger record at seq 0.
const REF_TRIGGER_HASH: &str =
    "dfff3a70e0694ee12f2649dd95d2fd52d82faf05d1402282ea5430970032fe25";

/// The canonical small fixture observation.
fn small_fixture() -> ObservedObject {
    ObservedObject {
        kind: "Agent".to_string(),
        metadata: json!({"name": "w0", "namespace": "default"}),
        spec: json!({"role": "worker", "workspace": {"size": "1Gi"}}),
    }
}

#[test]
fn small_fixture_produces_documented_reference_hashes() {
    let store = MemoryEventStore::new();
    let reducer = Reducer::engine();

    // Adapter emits the trigger at seq 0.
    let (draft, clock) = observe(&small_fixture(), LogicalClock::start()).expect("observe");
    assert_eq!(draft.aggregate_id.as_str(), REF_AGGREGATE_ID);
    let trigger = store.append(draft, GENESIS_PREV_HASH).expect("append trigger");
    assert_eq!(trigger.event.seq, 0);
    assert_eq!(trigger.event_hash, REF_TRIGGER_HASH);

    // The decision layer produces the sorted action list with fixed ids.
    let state = replay(&store, &reducer, Some(0)).expect("replay");
    let decision = decide(&state, &trigger).expect("decide");
    let ids: Vec<&str> =
        decision.actions.iter().map(|action| action.action_id.as_str()).collect();
    assert_eq!(ids, vec![REF_LAUNCH_SANDBOX_ID, REF_PROVISION_WORKSPACE_ID]);
    assert_eq!(decision.meta.actions_hash, REF_ACTIONS_HASH);
    assert_eq!(decision.meta.trigger_seq, 0);
    assert_eq!(decision.meta.trigger_hash, REF_TRIGGER_HASH);

    // The committed ActionsDecided event at seq 1 carries the provenance.
    let (decided_draft, _clock) = decision_event(&decision, &trigger, clock);
    let decided = store.append(decided_draft, &trigger.event_hash).expect("append decision");
    assert_eq!(decided.event.seq, 1);
    assert_eq!(decided.event.payload.get("trigger_seq"), Some(&json!(0)));
    assert_eq!(
        decided.event.payload.get("trigger_hash").and_then(Value::as_str),
        Some(REF_TRIGGER_HASH)
    );
    assert_eq!(
        decided.event.payload.get("actions_hash").and_then(Value::as_str),
        Some(REF_ACTIONS_HASH)
    );
}

#[test]
fn fixture_payload_is_fully_defaulted_and_normalized() {
    let (draft, _) = observe(&small_fixture(), LogicalClock::start()).expect("observe");
    assert_eq!(
        draft.payload,
        json!({
            "name": "w0",
            "namespace": "default",
            "spec": {
                "image": "agent-ledger/worker:stable",
                "role": "worker",
                "workspace": {"class": "standard", "size_bytes": "1073741824"},
            },
        })
    );
}
