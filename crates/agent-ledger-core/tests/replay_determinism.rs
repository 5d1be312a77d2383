// crates/agent-ledger-core/tests/replay_determinism.rs
// ============================================================================
// Module: Replay Determinism Tests
// Description: Repeated replays of mixed logs produce a single state hash.
// ============================================================================
//! ## Overview
//! Replays a 1000-event mixed log 100 times and requires one distinct state
//! hash, plus prefix-consistency for partial replay.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeSet;

use agent_ledger_core::AggregateId;
use agent_ledger_core::EventDraft;
use agent_ledger_core::EventStore;
use agent_ledger_core::GENESIS_PREV_HASH;
use agent_ledger_core::MemoryEventStore;
use agent_ledger_core::Reducer;
use agent_ledger_core::replay;
use agent_ledger_core::replay_events;
use serde_json::json;

/// Builds a 1000-event log cycling through four event types.
fn mixed_store() -> MemoryEventStore {
    let store = MemoryEventStore::new();
    let mut prev = GENESIS_PREV_HASH.to_string();
    for index in 0 .. 1000u64 {
        let agent = AggregateId::new(format!("agent-{}", index % 25));
        let draft = match index % 4 {
            0 => EventDraft::new(
                "AgentObserved",
                agent,
                index + 1,
                json!({"name": format!("w{}", index % 25), "namespace": "default", "spec": {"role": "worker"}}),
            ),
            1 => EventDraft::new(
                "ActionsDecided",
                agent,
                index + 1,
                json!({"trigger_seq": index - 1, "actions_hash": "", "action_ids": []}),
            ),
            2 => EventDraft::new(
                "ActionApplied",
                agent,
                index + 1,
                json!({"action_id": format!("act-{index}"), "target": "sandbox/x", "outcome": "ok"}),
            ),
            _ => EventDraft::new("AgentDeparted", agent, index + 1, json!({})),
        };
        prev = store.append(draft, &prev).expect("append").event_hash;
    }
    store
}

#[test]
fn replay_of_1000_mixed_events_is_deterministic_across_100_runs() {
    let store = mixed_store();
    let reducer = Reducer::engine();

    let mut hashes = BTreeSet::new();
    for _ in 0 .. 100 {
        let state = replay(&store, &reducer, None).expect("replay");
        assert_eq!(state.version(), 1000);
        hashes.insert(state.state_hash().expect("state hash"));
    }
    assert_eq!(hashes.len(), 1, "replay must produce a single distinct hash");
}

#[test]
fn partial_replay_matches_prefix_replay_bit_identically() {
    let store = mixed_store();
    let reducer = Reducer::engine();

    for cut in [0u64, 1, 99, 500, 999] {
        let partial = replay(&store, &reducer, Some(cut)).expect("partial replay");
        let prefix = store.read(0, Some(cut)).expect("read prefix");
        let folded = replay_events(&prefix, &reducer).expect("prefix replay");
        assert_eq!(
            partial.state_hash().expect("hash"),
            folded.state_hash().expect("hash"),
            "prefix cut at {cut} diverged"
        );
        assert_eq!(partial.version(), cut + 1);
    }
}
