// crates/agent-ledger-core/src/core/ids.rs
// ============================================================================
// Module: Ledger Identifiers
// Description: Opaque identifiers and content-derived stable ids.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: crate::core::canonical, serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings with stable wire forms. Stable ids are
//! derived from content via canonical hashing; random identifiers are
//! forbidden everywhere in the engine so that independent executions assign
//! identical ids.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::canonical;
use crate::core::canonical::sha256_hex;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Aggregate identifier naming the subject of an event.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates a new aggregate identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AggregateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AggregateId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Writer identity embedded into event metadata.
///
/// # Invariants
/// - Stable across restarts for a given replica identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriterId(String);

impl WriterId {
    /// Creates a new writer identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for WriterId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WriterId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Forensic fencing token attributing an event to a leadership epoch.
///
/// # Invariants
/// - Attribution only; the token never gates the store-side append precondition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FencingToken(String);

impl FencingToken {
    /// Creates a new fencing token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FencingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for FencingToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FencingToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Stable Identifiers
// ============================================================================

/// Derives a content-stable identifier from the given parts.
///
/// The identifier is the SHA-256 hex digest of the canonicalized JSON array
/// of parts, so identical parts always yield the identical id across runs,
/// hosts, and implementations.
#[must_use]
pub fn stable_id(parts: &[&str]) -> String {
    let array = Value::Array(parts.iter().map(|part| Value::String((*part).to_string())).collect());
    // Strings cannot contain floats, so canonicalization cannot fail here.
    canonical::canonical_bytes(&array).map_or_else(|_| String::new(), |bytes| sha256_hex(&bytes))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
