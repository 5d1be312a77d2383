// crates/agent-ledger-cli/src/report.rs
// ============================================================================
// Module: Audit Report
// Description: Chain verification, pointer verification, and decision proofs.
// Purpose: Produce the audit bundle consumed by operators and CI gates.
// Dependencies: agent-ledger-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An audit report is built from a validated read of the log and answers
//! three questions: does the chain verify, does every decision point at the
//! trigger it claims, and does re-running the decision policy reproduce the
//! committed action hashes. Every failure names the offending sequence
//! number.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_ledger_core::EVENT_ACTIONS_DECIDED;
use agent_ledger_core::LogRecord;
use agent_ledger_core::Reducer;
use agent_ledger_core::ReplayError;
use agent_ledger_core::StoreError;
use agent_ledger_core::decide;
use agent_ledger_core::replay_events;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Report generation errors.
///
/// # Invariants
/// - `Verification` failures map to CLI exit code 2; everything else is a
///   runtime error.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A verification step failed at a specific record.
    #[error("verification failed at seq {seq}: {detail}")]
    Verification {
        /// Offending sequence number.
        seq: u64,
        /// Human-readable diagnostic.
        detail: String,
    },
    /// The log could not be read.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Replay failed while rebuilding state for proofs.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

// ============================================================================
// SECTION: Report Model
// ============================================================================

/// Output format for audit reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Machine-readable JSON.
    Json,
    /// Human-readable Markdown.
    Markdown,
}

/// One verified trigger pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerCheck {
    /// Sequence of the `ActionsDecided` event.
    pub decided_seq: u64,
    /// Sequence of the trigger it points to.
    pub trigger_seq: u64,
    /// Whether the committed trigger hash matches the trigger record.
    pub valid: bool,
}

/// One decision proof result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofCheck {
    /// Sequence of the `ActionsDecided` event.
    pub decided_seq: u64,
    /// Sequence of the trigger the decision was recomputed for.
    pub trigger_seq: u64,
    /// Whether the recomputed `actions_hash` matches the committed one.
    pub reproduced: bool,
}

/// Audit bundle over a log prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Number of records covered.
    pub records: u64,
    /// Last covered sequence, if any records exist.
    pub last_seq: Option<u64>,
    /// `event_hash` of the last covered record.
    pub head_hash: Option<String>,
    /// Whether the chain verified.
    pub chain_valid: bool,
    /// Pointer verification results.
    pub pointers: Vec<PointerCheck>,
    /// Decision proof results; empty unless proofs were requested.
    pub proofs: Vec<ProofCheck>,
    /// Event counts by type, in type order.
    pub events_by_type: Vec<(String, u64)>,
}

// ============================================================================
// SECTION: Pointer Verification
// ============================================================================

/// Verifies every `ActionsDecided` trigger pointer in the record slice.
///
/// # Errors
///
/// Returns [`ReportError::Verification`] at the first decision whose
/// pointer is malformed or does not match the trigger record.
pub fn verify_pointers(records: &[LogRecord]) -> Result<Vec<PointerCheck>, ReportError> {
    let mut checks = Vec::new();
    for record in records {
        if record.event.event_type != EVENT_ACTIONS_DECIDED {
            continue;
        }
        let seq = record.event.seq;
        let trigger_seq = record
            .event
            .payload
            .get("trigger_seq")
            .and_then(Value::as_u64)
            .ok_or_else(|| ReportError::Verification {
                seq,
                detail: "decision lacks trigger_seq".to_string(),
            })?;
        let trigger_hash = record
            .event
            .payload
            .get("trigger_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| ReportError::Verification {
                seq,
                detail: "decision lacks trigger_hash".to_string(),
            })?;
        let trigger = records
            .iter()
            .find(|candidate| candidate.event.seq == trigger_seq)
            .ok_or_else(|| ReportError::Verification {
                seq,
                detail: format!("trigger seq {trigger_seq} not present in covered range"),
            })?;
        let valid = trigger.event_hash == trigger_hash;
        if !valid {
            return Err(ReportError::Verification {
                seq,
                detail: format!("trigger hash mismatch against seq {trigger_seq}"),
            });
        }
        checks.push(PointerCheck { decided_seq: seq, trigger_seq, valid });
    }
    Ok(checks)
}

// ============================================================================
// SECTION: Decision Proofs
// ============================================================================

/// Re-runs the decision policy for every covered decision event.
fn prove_decisions(
    records: &[LogRecord],
    reducer: &Reducer,
) -> Result<Vec<ProofCheck>, ReportError> {
    let mut proofs = Vec::new();
    for record in records {
        if record.event.event_type != EVENT_ACTIONS_DECIDED {
            continue;
        }
        let seq = record.event.seq;
        let trigger_seq = record
            .event
            .payload
            .get("trigger_seq")
            .and_then(Value::as_u64)
            .ok_or_else(|| ReportError::Verification {
                seq,
                detail: "decision lacks trigger_seq".to_string(),
            })?;
        let committed_hash = record
            .event
            .payload
            .get("actions_hash")
            .and_then(Value::as_str)
            .ok_or_else(|| ReportError::Verification {
                seq,
                detail: "decision lacks actions_hash".to_string(),
            })?;
        let trigger = records
            .iter()
            .find(|candidate| candidate.event.seq == trigger_seq)
            .ok_or_else(|| ReportError::Verification {
                seq,
                detail: format!("trigger seq {trigger_seq} not present in covered range"),
            })?;
        let prefix: Vec<LogRecord> = records
            .iter()
            .filter(|candidate| candidate.event.seq <= trigger_seq)
            .cloned()
            .collect();
        let state = replay_events(&prefix, reducer)?;
        let decision = decide(&state, trigger).map_err(|err| ReportError::Verification {
            seq,
            detail: format!("decision recomputation failed: {err}"),
        })?;
        let reproduced = decision.meta.actions_hash == committed_hash;
        if !reproduced {
            return Err(ReportError::Verification {
                seq,
                detail: "recomputed actions_hash differs from committed value".to_string(),
            });
        }
        proofs.push(ProofCheck { decided_seq: seq, trigger_seq, reproduced });
    }
    Ok(proofs)
}

// ============================================================================
// SECTION: Report Assembly
// ============================================================================

/// Builds the audit report over an already chain-validated record slice.
///
/// # Errors
///
/// Returns [`ReportError::Verification`] at the first pointer or proof
/// failure and [`ReportError::Replay`] when state reconstruction fails.
pub fn build_audit_report(
    records: &[LogRecord],
    reducer: &Reducer,
    with_proofs: bool,
) -> Result<AuditReport, ReportError> {
    let pointers = verify_pointers(records)?;
    let proofs = if with_proofs { prove_decisions(records, reducer)? } else { Vec::new() };

    let mut counts: std::collections::BTreeMap<String, u64> = std::collections::BTreeMap::new();
    for record in records {
        *counts.entry(record.event.event_type.clone()).or_default() += 1;
    }
    Ok(AuditReport {
        records: records.len() as u64,
        last_seq: records.last().map(|record| record.event.seq),
        head_hash: records.last().map(|record| record.event_hash.clone()),
        chain_valid: true,
        pointers,
        proofs,
        events_by_type: counts.into_iter().collect(),
    })
}

/// Renders the report as Markdown.
#[must_use]
pub fn render_markdown(report: &AuditReport) -> String {
    let mut out = String::new();
    out.push_str("# Ledger Audit Report\n\n");
    out.push_str(&format!("- Records covered: {}\n", report.records));
    if let Some(last_seq) = report.last_seq {
        out.push_str(&format!("- Last seq: {last_seq}\n"));
    }
    if let Some(head_hash) = &report.head_hash {
        out.push_str(&format!("- Head hash: `{head_hash}`\n"));
    }
    out.push_str(&format!(
        "- Chain: {}\n",
        if report.chain_valid { "valid" } else { "INVALID" }
    ));
    out.push_str(&format!("- Pointers verified: {}\n", report.pointers.len()));
    if !report.proofs.is_empty() {
        out.push_str(&format!("- Decision proofs reproduced: {}\n", report.proofs.len()));
    }
    out.push_str("\n## Events by type\n\n");
    out.push_str("| Type | Count |\n|---|---|\n");
    for (event_type, count) in &report.events_by_type {
        out.push_str(&format!("| {event_type} | {count} |\n"));
    }
    out
}
