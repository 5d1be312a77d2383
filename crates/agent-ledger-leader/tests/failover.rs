// crates/agent-ledger-leader/tests/failover.rs
// ============================================================================
// Module: Leader Failover Tests
// Description: Three replicas, one lease, scripted failover continuity.
// ============================================================================
//! ## Overview
//! Simulates three replicas sharing one coordination lease. After the active
//! leader is evicted, a successor must begin appending within one lease
//! duration, and full chain verification over the combined log must pass
//! with no gaps and no duplicates.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::time::Duration;

use agent_ledger_core::AggregateId;
use agent_ledger_core::EventDraft;
use agent_ledger_core::EventStore;
use agent_ledger_core::HashVersion;
use agent_ledger_core::MemoryEventStore;
use agent_ledger_core::RetryPolicy;
use agent_ledger_core::WriterId;
use agent_ledger_core::verify_chain;
use agent_ledger_leader::GateState;
use agent_ledger_leader::GatedWriter;
use agent_ledger_leader::InMemoryLease;
use agent_ledger_leader::LeaderGate;
use agent_ledger_leader::LeaseApi;
use agent_ledger_leader::LeaseTimings;
use serde_json::json;

/// Shared lease handle so every replica sees the same coordination store.
#[derive(Clone)]
struct SharedLease(Arc<InMemoryLease>);

impl LeaseApi for SharedLease {
    fn acquire(
        &self,
        holder_id: &str,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<agent_ledger_leader::LeaseGrant, agent_ledger_leader::LeaseError> {
        self.0.acquire(holder_id, now_ms, duration_ms)
    }

    fn renew(
        &self,
        holder_id: &str,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<agent_ledger_leader::LeaseGrant, agent_ledger_leader::LeaseError> {
        self.0.renew(holder_id, now_ms, duration_ms)
    }

    fn release(&self, holder_id: &str) -> Result<(), agent_ledger_leader::LeaseError> {
        self.0.release(holder_id)
    }

    fn current(
        &self,
    ) -> Result<Option<agent_ledger_leader::LeaseGrant>, agent_ledger_leader::LeaseError> {
        self.0.current()
    }
}

/// Returns compact timings for scripted tests.
fn timings() -> LeaseTimings {
    LeaseTimings { lease_duration_ms: 1000, renew_deadline_ms: 600, retry_period_ms: 100 }
}

/// Builds an `INC` draft at the given timestamp.
fn draft(ts: u64) -> EventDraft {
    EventDraft::new("INC", AggregateId::new("A"), ts, json!({"inc": 1}))
}

#[test]
fn successor_takes_over_within_one_lease_duration() {
    let store = MemoryEventStore::new();
    let lease = SharedLease(Arc::new(InMemoryLease::new()));
    let mut replicas: Vec<LeaderGate<SharedLease>> = ["r1", "r2", "r3"]
        .into_iter()
        .map(|id| LeaderGate::new(WriterId::new(id), lease.clone(), timings()))
        .collect();

    // Tick all replicas at t=0: exactly one becomes leader.
    let mut leaders = 0;
    for gate in &mut replicas {
        if gate.poll(0).expect("poll") == GateState::Leader {
            leaders += 1;
        }
    }
    assert_eq!(leaders, 1);
    assert_eq!(replicas[0].state(), GateState::Leader);

    // The leader appends a few events.
    let mut ts = 0u64;
    {
        let gate = &mut replicas[0];
        let mut writer =
            GatedWriter::new(&store, gate, HashVersion::V1, RetryPolicy::default());
        for _ in 0 .. 3 {
            ts += 1;
            writer.append(draft(ts), 100, Some(Duration::from_secs(1))).expect("append");
        }
    }

    // The operator deletes the active lease at t=200.
    lease.0.evict_holder().expect("evict");

    // Within one lease duration, a successor acquires and appends.
    let mut successor: Option<usize> = None;
    for now in [300u64, 400, 500] {
        for (index, gate) in replicas.iter_mut().enumerate() {
            if index == 0 {
                continue;
            }
            if gate.poll(now).expect("poll") == GateState::Leader {
                successor = Some(index);
                break;
            }
        }
        if successor.is_some() {
            break;
        }
    }
    let successor = successor.expect("a successor must emerge within one lease duration");

    {
        let gate = &mut replicas[successor];
        let mut writer =
            GatedWriter::new(&store, gate, HashVersion::V1, RetryPolicy::default());
        for _ in 0 .. 3 {
            ts += 1;
            writer.append(draft(ts), 600, Some(Duration::from_secs(1))).expect("append");
        }
    }

    // Combined log: contiguous, chain-sound, attributable to two epochs.
    let records = store.read(0, None).expect("read");
    assert_eq!(records.len(), 6);
    verify_chain(&records).expect("combined chain verifies");

    let tokens: Vec<String> = records
        .iter()
        .map(|record| {
            record.event.meta.fencing_token.as_ref().expect("token").as_str().to_string()
        })
        .collect();
    assert_eq!(tokens[0], tokens[2], "first epoch is uniform");
    assert_eq!(tokens[3], tokens[5], "second epoch is uniform");
    assert_ne!(tokens[0], tokens[3], "epochs differ across failover");
}

#[test]
fn old_leader_is_suppressed_during_cooldown() {
    let store = MemoryEventStore::new();
    let lease = SharedLease(Arc::new(InMemoryLease::new()));
    let mut old = LeaderGate::new(WriterId::new("r1"), lease.clone(), timings());
    let mut new = LeaderGate::new(WriterId::new("r2"), lease.clone(), timings());

    assert_eq!(old.poll(0).expect("poll"), GateState::Leader);
    lease.0.evict_holder().expect("evict");
    assert_eq!(new.poll(100).expect("poll"), GateState::Leader);

    // The old leader discovers the takeover on its next renewal and cools
    // down; appends are refused throughout the cooldown window.
    assert!(matches!(old.poll(200).expect("poll"), GateState::CoolingDown { .. }));
    let mut writer = GatedWriter::new(&store, &mut old, HashVersion::V1, RetryPolicy::default());
    assert!(writer.append(draft(1), 300, None).is_err());
    assert!(store.is_empty().expect("empty"));
}
