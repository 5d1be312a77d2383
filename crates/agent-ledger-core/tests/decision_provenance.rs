// crates/agent-ledger-core/tests/decision_provenance.rs
// ============================================================================
// Module: Decision Provenance Tests
// Description: Trigger pointers, decision determinism, and pointer soundness.
// ============================================================================
//! ## Overview
//! Decisions must be reproducible from the log alone: the `ActionsDecided`
//! event's trigger pointer binds it to its trigger record, and re-running the
//! policy over the replayed state yields the committed `actions_hash`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use agent_ledger_core::AggregateId;
use agent_ledger_core::EventDraft;
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

/// Appends a trigger and its decision the way a gated writer would.
fn append_trigger_and_decision(store: &MemoryEventStore) {
    let clock = LogicalClock::start();
    let (clock, ts) = clock.tick();
    let draft = EventDraft::new(
        "AgentObserved",
        AggregateId::new("agent-1"),
        ts,
        json!({
            "name": "w0",
            "namespace": "default",
            "spec": {"role": "worker", "workspace": {"size_bytes": "1073741824", "class": "standard"}},
        }),
    );
    let trigger = store.append(draft, GENESIS_PREV_HASH).expect("append trigger");

    let state = replay(store, &Reducer::engine(), Some(trigger.event.seq)).expect("replay");
    let decision = decide(&state, &trigger).expect("decide");
    let (decision_draft, _clock) = decision_event(&decision, &trigger, clock);
    store.append(decision_draft, &trigger.event_hash).expect("append decision");
}

#[test]
fn actions_decided_pointer_matches_trigger_record() {
    let store = MemoryEventStore::new();
    append_trigger_and_decision(&store);

    let records = store.read(0, None).expect("read");
    assert_eq!(records.len(), 2);
    let trigger = &records[0];
    let decided = &records[1];
    assert_eq!(decided.event.event_type, "ActionsDecided");
    assert_eq!(decided.event.payload.get("trigger_seq"), Some(&json!(0)));
    assert_eq!(
        decided.event.payload.get("trigger_hash").and_then(Value::as_str),
        Some(trigger.event_hash.as_str())
    );
}

#[test]
fn committed_actions_hash_is_reproducible_offline() {
    let store = MemoryEventStore::new();
    append_trigger_and_decision(&store);

    let records = store.read(0, None).expect("read");
    let trigger = &records[0];
    let decided = &records[1];

    // An independent verifier replays to the trigger and re-runs the policy.
    let state = replay(&store, &Reducer::engine(), Some(0)).expect("replay");
    let recomputed = decide(&state, trigger).expect("decide");
    assert_eq!(
        decided.event.payload.get("actions_hash").and_then(Value::as_str),
        Some(recomputed.meta.actions_hash.as_str())
    );
    let committed_ids = decided.event.payload.get("action_ids").expect("ids").clone();
    let recomputed_ids: Vec<Value> = recomputed
        .actions
        .iter()
        .map(|action| Value::String(action.action_id.clone()))
        .collect();
    assert_eq!(committed_ids, Value::Array(recomputed_ids));
}

#[test]
fn decision_is_identical_across_100_invocations() {
    let store = MemoryEventStore::new();
    append_trigger_and_decision(&store);
    let records = store.read(0, None).expect("read");
    let trigger = &records[0];
    let state = replay(&store, &Reducer::engine(), Some(0)).expect("replay");

    let baseline = decide(&state, trigger).expect("decide");
    for _ in 0 .. 100 {
        let decision = decide(&state, trigger).expect("decide");
        assert_eq!(decision.actions, baseline.actions);
        assert_eq!(decision.meta, baseline.meta);
    }
}
