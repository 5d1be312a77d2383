// crates/agent-ledger-adapter/src/defaults.rs
// ============================================================================
// Module: Default Materialization
// Description: The frozen default set applied to observed agent specs.
// Purpose: Collapse platform defaulting so identical specs hash identically.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The platform fills in unspecified fields when it admits an object, and
//! different platform versions may do so at different times. The adapter
//! therefore materializes defaults itself, from this single frozen table, so
//! that a spec observed before and after platform defaulting produces the
//! same payload.
//!
//! This table is frozen per hash version. Changing any entry changes hashes
//! for newly appended events and requires introducing a new hash version;
//! existing logs are unaffected because verification replays the rules that
//! were in force when each event was written.
//!
//! Frozen entries for kind `Agent`:
//!
//! | Field | Default |
//! |---|---|
//! | `spec.role` | `"worker"` |
//! | `spec.workspace` | `{}` |
//! | `spec.workspace.size` | `"1Gi"` |
//! | `spec.workspace.class` | `"standard"` |
//! | `spec.image` | role-keyed, see [`default_image_for_role`] |

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default role assigned to agents that do not declare one.
pub const DEFAULT_ROLE: &str = "worker";
/// Default workspace size quantity before normalization.
pub const DEFAULT_WORKSPACE_SIZE: &str = "1Gi";
/// Default workspace storage class.
pub const DEFAULT_WORKSPACE_CLASS: &str = "standard";

/// Returns the default sandbox image for a normalized role.
///
/// Unknown roles fall back to the worker image; the decision layer treats
/// the role itself as data, so an unknown role never fails adaptation.
#[must_use]
pub fn default_image_for_role(role: &str) -> &'static str {
    match role {
        "controller" => "agent-ledger/controller:stable",
        "observer" => "agent-ledger/observer:stable",
        _ => "agent-ledger/worker:stable",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::default_image_for_role;

    #[test]
    fn role_images_are_stable() {
        assert_eq!(default_image_for_role("worker"), "agent-ledger/worker:stable");
        assert_eq!(default_image_for_role("controller"), "agent-ledger/controller:stable");
        assert_eq!(default_image_for_role("observer"), "agent-ledger/observer:stable");
        assert_eq!(default_image_for_role("anything"), "agent-ledger/worker:stable");
    }
}
