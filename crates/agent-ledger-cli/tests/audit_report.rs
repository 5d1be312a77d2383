// crates/agent-ledger-cli/tests/audit_report.rs
// ============================================================================
// Module: Audit Report Tests
// Description: Report assembly, pointer checks, and proof failures on disk.
// ============================================================================
//! ## Overview
//! Builds a real file-backed log containing triggers and committed
//! decisions, then exercises the audit surface: pointer verification,
//! decision proofs, and the rendered outputs.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use agent_ledger_cli::ReportError;
use agent_ledger_cli::build_audit_report;
use agent_ledger_cli::render_markdown;
use agent_ledger_cli::verify_pointers;
use agent_ledger_core::AggregateId;
use agent_ledger_core::EventDraft;
use agent_ledger_core::EventStore;
use agent_ledger_core::LogicalClock;
use agent_ledger_core::Reducer;
use agent_ledger_core::RetryPolicy;
use agent_ledger_core::append_with_retry;
use agent_ledger_core::decide;
use agent_ledger_core::decision_event;
use agent_ledger_core::replay;
use agent_ledger_store_file::FileEventStore;
use agent_ledger_store_file::FileStoreConfig;
use serde_json::json;
use tempfile::TempDir;

/// Appends `count` trigger/decision pairs the way a gated writer would.
fn seed_log(store: &FileEventStore, count: u64) {
    let reducer = Reducer::engine();
    let mut clock = LogicalClock::start();
    for index in 0 .. count {
        let (next_clock, ts) = clock.tick();
        clock = next_clock;
        let draft = EventDraft::new(
            "AgentObserved",
            AggregateId::new(format!("agent-{index}")),
            ts,
            json!({
                "name": format!("w{index}"),
                "namespace": "default",
                "spec": {"role": "worker", "workspace": {"size_bytes": "1073741824", "class": "standard"}},
            }),
        );
        let trigger =
            append_with_retry(store, &draft, RetryPolicy::default(), None).expect("append");
        let state = replay(store, &reducer, Some(trigger.event.seq)).expect("replay");
        let decision = decide(&state, &trigger).expect("decide");
        let (decided, next_clock) = decision_event(&decision, &trigger, clock);
        clock = next_clock;
        append_with_retry(store, &decided, RetryPolicy::default(), None).expect("append");
    }
}

#[test]
fn report_covers_pointers_and_proofs() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileEventStore::open(FileStoreConfig::new(dir.path())).expect("open");
    seed_log(&store, 3);

    let records = store.read(0, None).expect("read");
    let report = build_audit_report(&records, &Reducer::engine(), true).expect("report");
    assert_eq!(report.records, 6);
    assert!(report.chain_valid);
    assert_eq!(report.pointers.len(), 3);
    assert_eq!(report.proofs.len(), 3);
    assert!(report.pointers.iter().all(|check| check.valid));
    assert!(report.proofs.iter().all(|check| check.reproduced));
    assert_eq!(
        report.events_by_type,
        vec![("ActionsDecided".to_string(), 3), ("AgentObserved".to_string(), 3)]
    );
}

#[test]
fn markdown_rendering_lists_event_counts() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileEventStore::open(FileStoreConfig::new(dir.path())).expect("open");
    seed_log(&store, 2);

    let records = store.read(0, None).expect("read");
    let report = build_audit_report(&records, &Reducer::engine(), false).expect("report");
    let rendered = render_markdown(&report);
    assert!(rendered.contains("# Ledger Audit Report"));
    assert!(rendered.contains("| AgentObserved | 2 |"));
    assert!(rendered.contains("Chain: valid"));
}

#[test]
fn forged_trigger_hash_fails_pointer_verification() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileEventStore::open(FileStoreConfig::new(dir.path())).expect("open");
    seed_log(&store, 2);

    let mut records = store.read(0, None).expect("read");
    // Forge the decision at seq 1 to point at a different trigger hash.
    let forged = json!({
        "trigger_seq": 0,
        "trigger_hash": "f".repeat(64),
        "actions_hash": records[1].event.payload.get("actions_hash").cloned(),
        "action_ids": [],
    });
    records[1].event.payload = forged;

    let err = verify_pointers(&records).expect_err("forged pointer must fail");
    match err {
        ReportError::Verification { seq, .. } => assert_eq!(seq, 1),
        other => panic!("expected verification failure, got {other}"),
    }
}

#[test]
fn forged_actions_hash_fails_the_proof() {
    let dir = TempDir::new().expect("tempdir");
    let store = FileEventStore::open(FileStoreConfig::new(dir.path())).expect("open");
    seed_log(&store, 1);

    let mut records = store.read(0, None).expect("read");
    let trigger_hash = records[0].event_hash.clone();
    records[1].event.payload = json!({
        "trigger_seq": 0,
        "trigger_hash": trigger_hash,
        "actions_hash": "0".repeat(64),
        "action_ids": [],
    });

    let err = build_audit_report(&records, &Reducer::engine(), true)
        .expect_err("forged actions hash must fail the proof");
    assert!(matches!(err, ReportError::Verification { seq: 1, .. }));
}
