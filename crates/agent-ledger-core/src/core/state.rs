// crates/agent-ledger-core/src/core/state.rs
// ============================================================================
// Module: State Container
// Description: Immutable derived state with a namespaced aggregate map.
// Purpose: Capture the fold of the event log for decisions and verification.
// Dependencies: crate::core::{canonical, ids}, serde, serde_json
// ============================================================================

//! ## Overview
//! State is derived, never ground truth: it is rebuilt from the log (or from
//! a verified checkpoint plus tail) and is conceptually frozen. Updates go
//! through [`State::set_aggregate`], which returns a new container; observable
//! mutation of an existing state is impossible through this API.
//!
//! `version` equals the number of events folded in, which makes it double as
//! the expected sequence number of the next event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::canonical::CanonicalError;
use crate::core::canonical::hash_canonical;
use crate::core::ids::AggregateId;

// ============================================================================
// SECTION: Aggregate Namespaces
// ============================================================================

/// Namespace holding agent workload aggregates.
pub const NS_AGENTS: &str = "agents";
/// Namespace holding decision provenance aggregates.
pub const NS_DECISIONS: &str = "decisions";
/// Namespace holding applied-action outcome aggregates.
pub const NS_ACTIONS: &str = "actions";

// ============================================================================
// SECTION: State
// ============================================================================

/// Immutable state container.
///
/// # Invariants
/// - `version` after folding events `[0..n]` equals `n + 1`.
/// - Aggregate values contain no floating-point numbers.
/// - Two states folded from identical event sequences hash identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Number of events folded into this state.
    version: u64,
    /// Aggregate namespace → aggregate id → aggregate value.
    aggregates: BTreeMap<String, BTreeMap<String, Value>>,
}

impl State {
    /// Creates the empty initial state at version zero.
    #[must_use]
    pub fn initial() -> Self {
        Self::default()
    }

    /// Returns the number of events folded into this state.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Looks up an aggregate value by namespace and id.
    #[must_use]
    pub fn get_aggregate(&self, namespace: &str, id: &AggregateId) -> Option<&Value> {
        self.aggregates.get(namespace).and_then(|bucket| bucket.get(id.as_str()))
    }

    /// Returns the full aggregate map for read-only inspection.
    #[must_use]
    pub const fn aggregates(&self) -> &BTreeMap<String, BTreeMap<String, Value>> {
        &self.aggregates
    }

    /// Returns a new state with the aggregate set, leaving `self` untouched.
    #[must_use]
    pub fn set_aggregate(&self, namespace: &str, id: &AggregateId, value: Value) -> Self {
        let mut aggregates = self.aggregates.clone();
        aggregates
            .entry(namespace.to_string())
            .or_default()
            .insert(id.as_str().to_string(), value);
        Self { version: self.version, aggregates }
    }

    /// Returns a new state with the version advanced by one.
    ///
    /// Only the reducer bumps versions; handlers shape aggregates and the
    /// reducer owns the fold count.
    #[must_use]
    pub(crate) fn bumped(self) -> Self {
        Self { version: self.version + 1, aggregates: self.aggregates }
    }

    /// Computes the canonical SHA-256 hash of this state.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when an aggregate value is not
    /// canonicalizable. This indicates a bug upstream: the adapter boundary
    /// rejects such values before they reach the log.
    pub fn state_hash(&self) -> Result<String, CanonicalError> {
        let value = serde_json::to_value(self)
            .map_err(|err| CanonicalError::Encoding(err.to_string()))?;
        hash_canonical(&value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use serde_json::json;

    use super::NS_AGENTS;
    use super::State;
    use crate::core::ids::AggregateId;

    #[test]
    fn set_aggregate_returns_new_state() {
        let initial = State::initial();
        let id = AggregateId::new("a");
        let updated = initial.set_aggregate(NS_AGENTS, &id, json!({"phase": "observed"}));
        assert!(initial.get_aggregate(NS_AGENTS, &id).is_none());
        assert_eq!(updated.get_aggregate(NS_AGENTS, &id), Some(&json!({"phase": "observed"})));
    }

    #[test]
    fn state_hash_is_stable_across_identical_folds() {
        let id = AggregateId::new("a");
        let left = State::initial().set_aggregate(NS_AGENTS, &id, json!({"n": 1})).bumped();
        let right = State::initial().set_aggregate(NS_AGENTS, &id, json!({"n": 1})).bumped();
        assert_eq!(left.state_hash().unwrap(), right.state_hash().unwrap());
    }

    #[test]
    fn state_hash_covers_version() {
        let plain = State::initial();
        let bumped = State::initial().bumped();
        assert_ne!(plain.state_hash().unwrap(), bumped.state_hash().unwrap());
    }
}
