// crates/agent-ledger-cli/src/keyfiles.rs
// ============================================================================
// Module: Checkpoint Key Files
// Description: Base64 key material loading and generation for checkpoints.
// Purpose: Keep signing keys out of configuration and logs.
// Dependencies: base64, ed25519-dalek, thiserror
// ============================================================================

//! ## Overview
//! Signing keys are 32-byte Ed25519 seeds stored base64-encoded in a file of
//! their own; verifying keys live next to them with a `.pub` extension. Key
//! management (rotation, PKI) is a deployment concern; these helpers only
//! read and write the local files the checkpoint commands need.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ed25519_dalek::SigningKey;
use ed25519_dalek::VerifyingKey;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size for key files.
const MAX_KEY_FILE_BYTES: u64 = 8 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Key file errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum KeyfileError {
    /// The file could not be read or written.
    #[error("key file io error: {0}")]
    Io(String),
    /// The file content is not valid key material.
    #[error("key file invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads a base64-encoded Ed25519 signing key.
///
/// # Errors
///
/// Returns [`KeyfileError`] when the file is unreadable, oversized, or not
/// a valid 32-byte seed.
pub fn load_signing_key(path: &Path) -> Result<SigningKey, KeyfileError> {
    let seed = read_key_bytes(path)?;
    let seed: [u8; 32] = seed
        .try_into()
        .map_err(|_| KeyfileError::Invalid("signing key must be 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&seed))
}

/// Loads a base64-encoded Ed25519 verifying key.
///
/// # Errors
///
/// Returns [`KeyfileError`] when the file is unreadable, oversized, or not
/// a valid public key.
pub fn load_verifying_key(path: &Path) -> Result<VerifyingKey, KeyfileError> {
    let bytes = read_key_bytes(path)?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeyfileError::Invalid("verifying key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|err| KeyfileError::Invalid(err.to_string()))
}

/// Reads and decodes one base64 key file.
fn read_key_bytes(path: &Path) -> Result<Vec<u8>, KeyfileError> {
    let metadata = fs::metadata(path).map_err(|err| KeyfileError::Io(err.to_string()))?;
    if metadata.len() > MAX_KEY_FILE_BYTES {
        return Err(KeyfileError::Invalid("key file too large".to_string()));
    }
    let encoded = fs::read_to_string(path).map_err(|err| KeyfileError::Io(err.to_string()))?;
    BASE64
        .decode(encoded.trim())
        .map_err(|err| KeyfileError::Invalid(err.to_string()))
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Writes a fresh keypair derived from the given seed bytes.
///
/// The signing key lands at `out`; the verifying key at `out` with a `.pub`
/// extension appended. Returns the verifying-key path.
///
/// # Errors
///
/// Returns [`KeyfileError::Io`] when either file cannot be written.
pub fn write_keypair(out: &Path, seed: &[u8; 32]) -> Result<PathBuf, KeyfileError> {
    let signing = SigningKey::from_bytes(seed);
    fs::write(out, BASE64.encode(signing.to_bytes()))
        .map_err(|err| KeyfileError::Io(err.to_string()))?;
    let mut public_path = out.as_os_str().to_os_string();
    public_path.push(".pub");
    let public_path = PathBuf::from(public_path);
    fs::write(&public_path, BASE64.encode(signing.verifying_key().to_bytes()))
        .map_err(|err| KeyfileError::Io(err.to_string()))?;
    Ok(public_path)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
