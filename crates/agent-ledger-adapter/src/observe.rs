// crates/agent-ledger-adapter/src/observe.rs
// ============================================================================
// Module: Observation Translation
// Description: Strip, default, normalize, and emit canonical event drafts.
// Purpose: Turn raw platform observations into replay-stable events.
// Dependencies: crate::{defaults, quantity}, agent-ledger-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Translation is a fixed pipeline: validate the observed kind, strip
//! platform-assigned metadata, materialize the frozen default set, normalize
//! enumerated fields and quantities, then emit through the canonicalizer with
//! a clock-assigned timestamp and a content-stable aggregate id.
//!
//! Fields whose values are only meaningful on the observing host are refused
//! outright rather than stripped: their presence means the caller is feeding
//! the adapter something it should not.

// ============================================================================
// SECTION: Imports
// ============================================================================

use agent_ledger_core::AggregateId;
use agent_ledger_core::CanonicalError;
use agent_ledger_core::EVENT_AGENT_DEPARTED;
use agent_ledger_core::EVENT_AGENT_OBSERVED;
use agent_ledger_core::EventDraft;
use agent_ledger_core::LogicalClock;
use agent_ledger_core::canonical_bytes;
use agent_ledger_core::stable_id;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::defaults::DEFAULT_ROLE;
use crate::defaults::DEFAULT_WORKSPACE_CLASS;
use crate::defaults::DEFAULT_WORKSPACE_SIZE;
use crate::defaults::default_image_for_role;
use crate::quantity::QuantityError;
use crate::quantity::quantity_to_bytes;

// ============================================================================
// SECTION: Strip Lists
// ============================================================================

/// Metadata fields assigned by the platform and varying across observations.
const STRIPPED_METADATA_FIELDS: [&str; 6] =
    ["uid", "resourceVersion", "generation", "creationTimestamp", "managedFields", "selfLink"];

/// Annotations rewritten by platform tooling on every apply.
const STRIPPED_ANNOTATIONS: [&str; 1] = ["kubectl.kubernetes.io/last-applied-configuration"];

/// Spec fields whose values are only meaningful on the observing host.
const FORBIDDEN_SPEC_FIELDS: [&str; 3] = ["nodeName", "hostIP", "hostPath"];

/// The only observed kind this adapter translates.
const OBSERVED_KIND_AGENT: &str = "Agent";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Adapter errors raised at the canonicalization boundary.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The observed kind has no translation rules.
    #[error("unsupported observed kind: {0}")]
    UnsupportedKind(String),
    /// A required metadata field is missing or has the wrong shape.
    #[error("malformed observation: {0}")]
    Malformed(String),
    /// The spec carries a host-local field that must not be translated.
    #[error("host-local field forbidden in spec: {0}")]
    ForbiddenField(String),
    /// A workspace quantity failed normalization.
    #[error(transparent)]
    Quantity(#[from] QuantityError),
    /// The normalized payload failed canonicalization.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

// ============================================================================
// SECTION: Observed Objects
// ============================================================================

/// Raw object as observed from the orchestration platform.
///
/// # Invariants
/// - `metadata` and `spec` are untrusted and validated during translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedObject {
    /// Observed kind name.
    pub kind: String,
    /// Raw object metadata.
    pub metadata: Value,
    /// Raw object spec.
    pub spec: Value,
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates an observation into an `AgentObserved` draft.
///
/// The clock is advanced exactly once per emitted event.
///
/// # Errors
///
/// Returns [`AdapterError`] when the kind is unsupported, the observation is
/// malformed, a host-local field is present, or normalization fails.
pub fn observe(
    object: &ObservedObject,
    clock: LogicalClock,
) -> Result<(EventDraft, LogicalClock), AdapterError> {
    if object.kind != OBSERVED_KIND_AGENT {
        return Err(AdapterError::UnsupportedKind(object.kind.clone()));
    }
    let (name, namespace) = identity(object)?;
    let spec = normalize_spec(object)?;

    let mut payload = Map::new();
    payload.insert("name".to_string(), Value::String(name.clone()));
    payload.insert("namespace".to_string(), Value::String(namespace.clone()));
    if let Some(metadata) = stripped_metadata(object) {
        payload.insert("metadata".to_string(), metadata);
    }
    payload.insert("spec".to_string(), spec);
    let payload = Value::Object(payload);
    // Reject floats before the payload can reach the log.
    canonical_bytes(&payload)?;

    let aggregate_id = AggregateId::new(stable_id(&["agent", &namespace, &name]));
    let (clock, ts) = clock.tick();
    Ok((EventDraft::new(EVENT_AGENT_OBSERVED, aggregate_id, ts, payload), clock))
}

/// Translates a deletion observation into an `AgentDeparted` draft.
///
/// # Errors
///
/// Returns [`AdapterError`] when the kind is unsupported or the observation
/// is malformed.
pub fn observe_departure(
    object: &ObservedObject,
    clock: LogicalClock,
) -> Result<(EventDraft, LogicalClock), AdapterError> {
    if object.kind != OBSERVED_KIND_AGENT {
        return Err(AdapterError::UnsupportedKind(object.kind.clone()));
    }
    let (name, namespace) = identity(object)?;
    let mut payload = Map::new();
    payload.insert("name".to_string(), Value::String(name.clone()));
    payload.insert("namespace".to_string(), Value::String(namespace.clone()));
    let aggregate_id = AggregateId::new(stable_id(&["agent", &namespace, &name]));
    let (clock, ts) = clock.tick();
    Ok((EventDraft::new(EVENT_AGENT_DEPARTED, aggregate_id, ts, Value::Object(payload)), clock))
}

// ============================================================================
// SECTION: Normalization Steps
// ============================================================================

/// Extracts the required name and defaulted namespace.
fn identity(object: &ObservedObject) -> Result<(String, String), AdapterError> {
    let name = object
        .metadata
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::Malformed("metadata.name missing".to_string()))?;
    let namespace =
        object.metadata.get("namespace").and_then(Value::as_str).unwrap_or("default");
    Ok((name.to_string(), namespace.to_string()))
}

/// Returns metadata with platform-assigned fields removed.
///
/// The identity fields (`name`, `namespace`) are carried at the payload top
/// level and skipped here. Returns `None` when nothing survives stripping,
/// so an absent map and a fully stripped map collapse to the same payload.
fn stripped_metadata(object: &ObservedObject) -> Option<Value> {
    let metadata = object.metadata.as_object()?;
    let mut kept = Map::new();
    for (key, value) in metadata {
        if STRIPPED_METADATA_FIELDS.contains(&key.as_str())
            || matches!(key.as_str(), "name" | "namespace")
        {
            continue;
        }
        if key == "annotations" {
            if let Some(annotations) = stripped_annotations(value) {
                kept.insert(key.clone(), annotations);
            }
            continue;
        }
        kept.insert(key.clone(), value.clone());
    }
    if kept.is_empty() { None } else { Some(Value::Object(kept)) }
}

/// Returns the annotations object with platform-managed keys removed.
fn stripped_annotations(annotations: &Value) -> Option<Value> {
    let annotations = annotations.as_object()?;
    let mut kept = Map::new();
    for (key, value) in annotations {
        if !STRIPPED_ANNOTATIONS.contains(&key.as_str()) {
            kept.insert(key.clone(), value.clone());
        }
    }
    if kept.is_empty() { None } else { Some(Value::Object(kept)) }
}

/// Applies defaulting and normalization to the observed spec.
fn normalize_spec(object: &ObservedObject) -> Result<Value, AdapterError> {
    let spec = match &object.spec {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => return Err(AdapterError::Malformed("spec must be an object".to_string())),
    };
    for field in FORBIDDEN_SPEC_FIELDS {
        if spec.contains_key(field) {
            return Err(AdapterError::ForbiddenField(field.to_string()));
        }
    }

    let role = spec
        .get("role")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_ROLE)
        .to_lowercase();

    let workspace = spec.get("workspace").and_then(Value::as_object).cloned().unwrap_or_default();
    let size = workspace
        .get("size")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_WORKSPACE_SIZE);
    let class = workspace
        .get("class")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_WORKSPACE_CLASS);
    let mut normalized_workspace = Map::new();
    normalized_workspace
        .insert("size_bytes".to_string(), Value::String(quantity_to_bytes(size)?));
    normalized_workspace.insert("class".to_string(), Value::String(class.to_string()));

    let image = spec
        .get("image")
        .and_then(Value::as_str)
        .map_or_else(|| default_image_for_role(&role).to_string(), str::to_string);

    let mut normalized = Map::new();
    for (key, value) in &spec {
        // Normalized fields are re-inserted below in canonical form.
        if !matches!(key.as_str(), "role" | "workspace" | "image") {
            normalized.insert(key.clone(), value.clone());
        }
    }
    normalized.insert("role".to_string(), Value::String(role));
    normalized.insert("workspace".to_string(), Value::Object(normalized_workspace));
    normalized.insert("image".to_string(), Value::String(image));
    Ok(Value::Object(normalized))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only panic-based assertions are permitted.")]

    use agent_ledger_core::LogicalClock;
    use serde_json::json;

    use super::AdapterError;
    use super::ObservedObject;
    use super::observe;
    use super::observe_departure;

    /// Builds an `Agent` observation from raw metadata and spec.
    fn fixture(metadata: serde_json::Value, spec: serde_json::Value) -> ObservedObject {
        ObservedObject { kind: "Agent".to_string(), metadata, spec }
    }

    #[test]
    fn platform_assigned_fields_do_not_change_the_payload() {
        let plain = fixture(json!({"name": "w0", "namespace": "default"}), json!({"role": "worker"}));
        let noisy = fixture(
            json!({
                "name": "w0",
                "namespace": "default",
                "uid": "8b2f",
                "resourceVersion": "12345",
                "generation": 3,
                "creationTimestamp": "2026-07-01T00:00:00Z",
                "managedFields": [{"manager": "kubectl"}],
                "annotations": {"kubectl.kubernetes.io/last-applied-configuration": "{}"},
            }),
            json!({"role": "worker"}),
        );
        let (left, _) = observe(&plain, LogicalClock::start()).unwrap();
        let (right, _) = observe(&noisy, LogicalClock::start()).unwrap();
        assert_eq!(left.payload, right.payload);
        assert_eq!(left.aggregate_id, right.aggregate_id);
    }

    #[test]
    fn platform_defaulting_collapses_to_the_same_payload() {
        let sparse = fixture(json!({"name": "w0"}), json!({}));
        let defaulted = fixture(
            json!({"name": "w0", "namespace": "default"}),
            json!({
                "role": "worker",
                "workspace": {"size": "1Gi", "class": "standard"},
                "image": "agent-ledger/worker:stable",
            }),
        );
        let (left, _) = observe(&sparse, LogicalClock::start()).unwrap();
        let (right, _) = observe(&defaulted, LogicalClock::start()).unwrap();
        assert_eq!(left.payload, right.payload);
    }

    #[test]
    fn stable_metadata_survives_stripping() {
        let object = fixture(
            json!({
                "name": "w0",
                "uid": "8b2f",
                "labels": {"tier": "gold"},
                "annotations": {
                    "kubectl.kubernetes.io/last-applied-configuration": "{}",
                    "ledger/owner": "team-a",
                },
            }),
            json!({}),
        );
        let (draft, _) = observe(&object, LogicalClock::start()).unwrap();
        assert_eq!(draft.payload.pointer("/metadata/labels/tier"), Some(&json!("gold")));
        assert_eq!(
            draft.payload.pointer("/metadata/annotations/ledger~1owner"),
            Some(&json!("team-a"))
        );
        assert!(draft.payload.pointer("/metadata/uid").is_none());
    }

    #[test]
    fn role_case_is_normalized() {
        let shouting = fixture(json!({"name": "w0"}), json!({"role": "Controller"}));
        let (draft, _) = observe(&shouting, LogicalClock::start()).unwrap();
        assert_eq!(
            draft.payload.pointer("/spec/role"),
            Some(&json!("controller"))
        );
        assert_eq!(
            draft.payload.pointer("/spec/image"),
            Some(&json!("agent-ledger/controller:stable"))
        );
    }

    #[test]
    fn workspace_size_normalizes_to_bytes() {
        let object = fixture(json!({"name": "w0"}), json!({"workspace": {"size": "512Mi"}}));
        let (draft, _) = observe(&object, LogicalClock::start()).unwrap();
        assert_eq!(
            draft.payload.pointer("/spec/workspace/size_bytes"),
            Some(&json!("536870912"))
        );
    }

    #[test]
    fn clock_advances_exactly_once_per_event() {
        let object = fixture(json!({"name": "w0"}), json!({}));
        let clock = LogicalClock::start();
        let (first, clock) = observe(&object, clock).unwrap();
        let (second, clock) = observe(&object, clock).unwrap();
        assert_eq!(first.ts, 1);
        assert_eq!(second.ts, 2);
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn host_local_fields_are_refused() {
        let object = fixture(json!({"name": "w0"}), json!({"nodeName": "node-7"}));
        let err = observe(&object, LogicalClock::start()).unwrap_err();
        assert!(matches!(err, AdapterError::ForbiddenField(_)));
    }

    #[test]
    fn float_spec_values_are_refused() {
        let object = fixture(json!({"name": "w0"}), json!({"priority": 0.5}));
        let err = observe(&object, LogicalClock::start()).unwrap_err();
        assert!(matches!(err, AdapterError::Canonical(_)));
    }

    #[test]
    fn unsupported_kind_is_refused() {
        let object = ObservedObject {
            kind: "Gadget".to_string(),
            metadata: json!({"name": "g"}),
            spec: json!({}),
        };
        assert!(matches!(
            observe(&object, LogicalClock::start()),
            Err(AdapterError::UnsupportedKind(_))
        ));
    }

    #[test]
    fn departure_shares_the_aggregate_id() {
        let object = fixture(json!({"name": "w0", "namespace": "prod"}), json!({}));
        let (observed, clock) = observe(&object, LogicalClock::start()).unwrap();
        let (departed, _) = observe_departure(&object, clock).unwrap();
        assert_eq!(observed.aggregate_id, departed.aggregate_id);
        assert_eq!(departed.event_type, "AgentDeparted");
    }

    #[test]
    fn missing_name_is_malformed() {
        let object = fixture(json!({"namespace": "default"}), json!({}));
        assert!(matches!(
            observe(&object, LogicalClock::start()),
            Err(AdapterError::Malformed(_))
        ));
    }
}
