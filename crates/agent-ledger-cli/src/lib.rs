// crates/agent-ledger-cli/src/lib.rs
// ============================================================================
// Module: Agent Ledger CLI Library
// Description: Inspection, audit, and checkpoint workflows behind the binary.
// Purpose: Keep command logic testable apart from argument parsing.
// Dependencies: agent-ledger-core, agent-ledger-store-file, base64, ed25519-dalek, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The binary in `main.rs` only parses arguments and maps outcomes to exit
//! codes; everything observable lives here. Verification failures carry the
//! offending sequence number so operators can jump straight to the corrupt
//! record.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod keyfiles;
pub mod report;

pub use keyfiles::KeyfileError;
pub use keyfiles::load_signing_key;
pub use keyfiles::load_verifying_key;
pub use keyfiles::write_keypair;
pub use report::AuditReport;
pub use report::PointerCheck;
pub use report::ProofCheck;
pub use report::ReportError;
pub use report::ReportFormat;
pub use report::build_audit_report;
pub use report::render_markdown;
pub use report::verify_pointers;
