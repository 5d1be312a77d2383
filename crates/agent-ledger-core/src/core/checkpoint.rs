// crates/agent-ledger-core/src/core/checkpoint.rs
// ============================================================================
// Module: Signed Checkpoints
// Description: Ed25519-signed snapshots of (state hash, log hash, sequence).
// Purpose: Let verifiers skip genesis replay without trusting the writer.
// Dependencies: crate::core::{canonical, ids, state}, ed25519-dalek, serde, thiserror
// ============================================================================

//! ## Overview
//! A checkpoint commits to the state hash and log hash at a sequence number.
//! The signature covers the canonical bytes of
//! `{checkpoint_id, at_seq, state_hash, log_hash}`; the timestamp and author
//! are audit metadata outside the signed surface. Checkpoints are write-once:
//! `checkpoint_id` is content-derived, so the same commitment always gets the
//! same identity.
//!
//! Verification is layered: signature, then bundle consistency (the carried
//! state must hash to `state_hash`), then, for full audits, a re-replay of
//! the log up to `at_seq` confirming both hashes independently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ed25519_dalek::Signature;
use ed25519_dalek::Signer;
use ed25519_dalek::SigningKey;
use ed25519_dalek::Verifier;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::canonical::CanonicalError;
use crate::core::canonical::canonical_bytes;
use crate::core::canonical::from_hex;
use crate::core::canonical::to_hex;
use crate::core::ids::stable_id;
use crate::core::state::State;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Checkpoint creation and verification errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Canonicalization of the signed surface failed.
    #[error("checkpoint canonicalization failed: {0}")]
    Canonical(#[from] CanonicalError),
    /// The signature is malformed or does not verify.
    #[error("checkpoint signature invalid: {0}")]
    Signature(String),
    /// The checkpoint id does not match its content.
    #[error("checkpoint id mismatch")]
    IdMismatch,
    /// The bundled state does not hash to the committed state hash.
    #[error("checkpoint state hash mismatch at seq {at_seq}")]
    StateHashMismatch {
        /// Sequence number the checkpoint commits to.
        at_seq: u64,
    },
    /// The log hash recomputed from the store does not match the commitment.
    #[error("checkpoint log hash mismatch at seq {at_seq}")]
    LogHashMismatch {
        /// Sequence number the checkpoint commits to.
        at_seq: u64,
    },
}

// ============================================================================
// SECTION: Checkpoint Records
// ============================================================================

/// Signed snapshot commitment.
///
/// # Invariants
/// - `checkpoint_id` is content-derived from `(at_seq, state_hash, log_hash)`.
/// - `signature` is Ed25519 over the canonical signed surface, hex-encoded.
/// - Checkpoints are never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Content-derived checkpoint identity.
    pub checkpoint_id: String,
    /// Sequence number the snapshot was taken at (inclusive).
    pub at_seq: u64,
    /// Canonical state hash after folding events `[0..at_seq]`.
    pub state_hash: String,
    /// `event_hash` of the log record at `at_seq`.
    pub log_hash: String,
    /// Hex-encoded Ed25519 signature over the signed surface.
    pub signature: String,
    /// Creation timestamp (audit metadata, outside the signed surface).
    pub timestamp: u64,
    /// Creator identity (audit metadata, outside the signed surface).
    pub created_by: String,
}

/// Checkpoint paired with the state snapshot it commits to.
///
/// # Invariants
/// - `state.state_hash()` equals `checkpoint.state_hash` for a valid bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointBundle {
    /// The signed commitment.
    pub checkpoint: Checkpoint,
    /// The state snapshot at `checkpoint.at_seq`.
    pub state: State,
}

// ============================================================================
// SECTION: Creation and Verification
// ============================================================================

impl Checkpoint {
    /// Creates and signs a checkpoint for the given state and log hash.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Canonical`] when the state or the signed
    /// surface cannot be canonicalized.
    pub fn create(
        state: &State,
        at_seq: u64,
        log_hash: impl Into<String>,
        signing_key: &SigningKey,
        timestamp: u64,
        created_by: impl Into<String>,
    ) -> Result<Self, CheckpointError> {
        let state_hash = state.state_hash()?;
        let log_hash = log_hash.into();
        let checkpoint_id =
            stable_id(&["checkpoint", &at_seq.to_string(), &state_hash, &log_hash]);
        let surface = signed_surface(&checkpoint_id, at_seq, &state_hash, &log_hash)?;
        let signature = signing_key.sign(&surface);
        Ok(Self {
            checkpoint_id,
            at_seq,
            state_hash,
            log_hash,
            signature: to_hex(&signature.to_bytes()),
            timestamp,
            created_by: created_by.into(),
        })
    }

    /// Verifies the checkpoint's identity and signature.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::IdMismatch`] when the identity was not
    /// derived from the commitment, or [`CheckpointError::Signature`] when
    /// the signature is malformed or fails verification.
    pub fn verify(&self, verifying_key: &VerifyingKey) -> Result<(), CheckpointError> {
        let expected_id =
            stable_id(&["checkpoint", &self.at_seq.to_string(), &self.state_hash, &self.log_hash]);
        if expected_id != self.checkpoint_id {
            return Err(CheckpointError::IdMismatch);
        }
        let surface =
            signed_surface(&self.checkpoint_id, self.at_seq, &self.state_hash, &self.log_hash)?;
        let bytes = from_hex(&self.signature)
            .map_err(|err| CheckpointError::Signature(err.to_string()))?;
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CheckpointError::Signature("signature must be 64 bytes".to_string()))?;
        let signature = Signature::from_bytes(&array);
        verifying_key
            .verify(&surface, &signature)
            .map_err(|err| CheckpointError::Signature(err.to_string()))
    }
}

impl CheckpointBundle {
    /// Verifies the signature and the bundled state against the commitment.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError`] when the signature fails or the bundled
    /// state does not hash to the committed `state_hash`.
    pub fn verify(&self, verifying_key: &VerifyingKey) -> Result<(), CheckpointError> {
        self.checkpoint.verify(verifying_key)?;
        let state_hash = self.state.state_hash()?;
        if state_hash != self.checkpoint.state_hash {
            return Err(CheckpointError::StateHashMismatch { at_seq: self.checkpoint.at_seq });
        }
        Ok(())
    }
}

/// Builds the canonical signed surface for a checkpoint.
fn signed_surface(
    checkpoint_id: &str,
    at_seq: u64,
    state_hash: &str,
    log_hash: &str,
) -> Result<Vec<u8>, CheckpointError> {
    let mut surface = Map::new();
    surface.insert("checkpoint_id".to_string(), Value::String(checkpoint_id.to_string()));
    surface.insert("at_seq".to_string(), Value::from(at_seq));
    surface.insert("state_hash".to_string(), Value::String(state_hash.to_string()));
    surface.insert("log_hash".to_string(), Value::String(log_hash.to_string()));
    canonical_bytes(&Value::Object(surface)).map_err(CheckpointError::Canonical)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
