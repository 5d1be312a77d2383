// crates/agent-ledger-core/src/core/action.rs
// ============================================================================
// Module: Intended Actions
// Description: Canonical action records produced by the decision layer.
// Purpose: Give every intended side effect a stable, content-derived identity.
// Dependencies: crate::core::canonical, serde, serde_json
// ============================================================================

//! ## Overview
//! An action describes one intended external effect. Its identity is the
//! hash of its canonicalized content, which gives the decision layer a total
//! order and free deduplication: two writers that decide the same thing
//! produce byte-identical action lists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::canonical::CanonicalError;
use crate::core::canonical::hash_canonical;

// ============================================================================
// SECTION: Action Types
// ============================================================================

/// Enumerated action kinds the executor understands.
///
/// # Invariants
/// - Wire spellings are stable for serialization and hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Provision or resize the agent's workspace volume.
    ProvisionWorkspace,
    /// Launch or update the agent's sandbox runtime.
    LaunchSandbox,
    /// Attach the control stream for controller-role agents.
    AttachControlStream,
    /// Tear down the agent's sandbox runtime.
    TeardownSandbox,
    /// Release the agent's workspace volume.
    ReleaseWorkspace,
}

impl ActionType {
    /// Returns the stable wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProvisionWorkspace => "provision_workspace",
            Self::LaunchSandbox => "launch_sandbox",
            Self::AttachControlStream => "attach_control_stream",
            Self::TeardownSandbox => "teardown_sandbox",
            Self::ReleaseWorkspace => "release_workspace",
        }
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// One intended external effect.
///
/// # Invariants
/// - `action_id` is the SHA-256 of the canonicalized
///   `[action_type, target, params]` triple.
/// - `params` contains no floating-point numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Enumerated action kind.
    pub action_type: ActionType,
    /// External object the action would produce or modify.
    pub target: String,
    /// Canonicalized action parameters.
    pub params: Value,
    /// Content-derived identity used for ordering and deduplication.
    pub action_id: String,
}

impl Action {
    /// Builds an action, deriving its content identity.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when `params` is not canonicalizable.
    pub fn build(
        action_type: ActionType,
        target: impl Into<String>,
        params: Value,
    ) -> Result<Self, CanonicalError> {
        let target = target.into();
        let identity = Value::Array(vec![
            Value::String(action_type.as_str().to_string()),
            Value::String(target.clone()),
            params.clone(),
        ]);
        let action_id = hash_canonical(&identity)?;
        Ok(Self { action_type, target, params, action_id })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use serde_json::json;

    use super::Action;
    use super::ActionType;

    #[test]
    fn action_id_is_content_derived() {
        let left =
            Action::build(ActionType::LaunchSandbox, "sbx/worker-0", json!({"role": "worker"}))
                .unwrap();
        let right =
            Action::build(ActionType::LaunchSandbox, "sbx/worker-0", json!({"role": "worker"}))
                .unwrap();
        assert_eq!(left.action_id, right.action_id);
    }

    #[test]
    fn action_id_separates_type_and_target() {
        let launch =
            Action::build(ActionType::LaunchSandbox, "x", json!({})).unwrap();
        let teardown =
            Action::build(ActionType::TeardownSandbox, "x", json!({})).unwrap();
        assert_ne!(launch.action_id, teardown.action_id);
    }

    #[test]
    fn float_params_are_rejected() {
        assert!(Action::build(ActionType::ProvisionWorkspace, "x", json!({"gb": 1.5})).is_err());
    }
}
