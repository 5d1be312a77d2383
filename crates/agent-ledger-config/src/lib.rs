// crates/agent-ledger-config/src/lib.rs
// ============================================================================
// Module: Agent Ledger Config
// Description: Canonical configuration model, TOML loading, and validation.
// Purpose: Give deployments one validated source of ledger settings.
// Dependencies: agent-ledger-core, agent-ledger-store-file, agent-ledger-store-object, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is deserialized from TOML and validated before anything
//! touches a store or a lease. Validation enforces the cross-field
//! invariants the engine depends on: leader timings must be strictly
//! ordered, retry parameters bounded, and exactly the settings for the
//! selected backend present.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use agent_ledger_core::HashVersion;
use agent_ledger_store_file::FileStoreConfig;
use agent_ledger_store_object::ObjectStoreConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// The TOML failed to parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// A cross-field invariant does not hold.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Leader Timings
// ============================================================================

/// Leader-gate timing configuration in milliseconds.
///
/// # Invariants
/// - `retry_period_ms < renew_deadline_ms < lease_duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderConfig {
    /// Full lease term granted on acquire and renew.
    pub lease_duration_ms: u64,
    /// Local loss deadline after the last successful renewal.
    pub renew_deadline_ms: u64,
    /// Interval between acquisition attempts while following.
    pub retry_period_ms: u64,
}

impl Default for LeaderConfig {
    fn default() -> Self {
        Self { lease_duration_ms: 15_000, renew_deadline_ms: 10_000, retry_period_ms: 2_000 }
    }
}

// ============================================================================
// SECTION: Retry Settings
// ============================================================================

/// Append retry configuration.
///
/// # Invariants
/// - `max_attempts >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of append attempts.
    pub max_attempts: u32,
    /// Base backoff in milliseconds after the first conflict.
    pub base_backoff_ms: u64,
    /// Upper bound of the random jitter in milliseconds.
    pub jitter_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 5, base_backoff_ms: 25, jitter_cap_ms: 50 }
    }
}

// ============================================================================
// SECTION: Store Selection
// ============================================================================

/// Store backend settings; exactly one backend must be configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// File backend settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileStoreConfig>,
    /// Object-store backend settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectStoreConfig>,
}

// ============================================================================
// SECTION: Ledger Config
// ============================================================================

/// Top-level ledger configuration.
///
/// # Invariants
/// - `writer_id` is stable across restarts for a given replica identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Hash version stamped into newly appended events.
    #[serde(default)]
    pub hash_version: HashVersion,
    /// Writer identity embedded into event metadata.
    pub writer_id: String,
    /// Store backend selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Leader-gate timings.
    #[serde(default)]
    pub leader: LeaderConfig,
    /// Append retry parameters.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl LedgerConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, unparsable, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let config: Self =
            toml::from_str(&raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.writer_id.trim().is_empty() {
            return Err(ConfigError::Invalid("writer_id must be set".to_string()));
        }
        match (&self.store.file, &self.store.object) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "exactly one store backend must be configured".to_string(),
                ));
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::Invalid(
                    "file and object backends are mutually exclusive".to_string(),
                ));
            }
            _ => {}
        }
        if let Some(object) = &self.store.object
            && object.bucket.trim().is_empty()
        {
            return Err(ConfigError::Invalid("object store bucket must be set".to_string()));
        }
        let leader = &self.leader;
        if leader.renew_deadline_ms >= leader.lease_duration_ms {
            return Err(ConfigError::Invalid(
                "renew_deadline_ms must be shorter than lease_duration_ms".to_string(),
            ));
        }
        if leader.retry_period_ms >= leader.renew_deadline_ms {
            return Err(ConfigError::Invalid(
                "retry_period_ms must be shorter than renew_deadline_ms".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be >= 1".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
