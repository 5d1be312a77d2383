// crates/agent-ledger-core/tests/proptest_canonical.rs
// ============================================================================
// Module: Canonical Invariance Properties
// Description: Property tests for canonicalization and stable hashing.
// ============================================================================
//! ## Overview
//! Canonical bytes must be invariant under mapping key permutations and must
//! reject floats anywhere in the tree. Generated values use the restricted
//! payload shape: string keys, integers, decimal strings, booleans, null,
//! arrays, and nested mappings.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use agent_ledger_core::canonical_bytes;
use agent_ledger_core::hash_canonical;
use proptest::collection::btree_map;
use proptest::collection::vec;
use proptest::prelude::Just;
use proptest::prelude::Strategy;
use proptest::prelude::any;
use proptest::prelude::prop_oneof;
use proptest::proptest;
use serde_json::Map;
use serde_json::Value;

/// Largest integer magnitude exactly representable as an IEEE double,
/// the I-JSON bound RFC 8785 imposes on the number space.
const MAX_SAFE_INT: i64 = 1 << 53;

/// Strategy for float-free JSON values of bounded depth.
fn payload_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-MAX_SAFE_INT ..= MAX_SAFE_INT).prop_map(Value::from),
        "[a-z0-9]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0 .. 6).prop_map(Value::Array),
            btree_map("[a-z][a-z0-9_]{0,8}", inner, 0 .. 6).prop_map(|entries| {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key, value);
                }
                Value::Object(map)
            }),
        ]
    })
}

/// Rebuilds every object in the tree with reversed key insertion order.
fn reverse_key_order(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, item) in map.iter().rev() {
                out.insert(key.clone(), reverse_key_order(item));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(reverse_key_order).collect()),
        other => other.clone(),
    }
}

proptest! {
    #[test]
    fn canonical_bytes_are_key_order_invariant(value in payload_value()) {
        let permuted = reverse_key_order(&value);
        let left = canonical_bytes(&value).expect("canonical");
        let right = canonical_bytes(&permuted).expect("canonical");
        assert_eq!(left, right);
    }

    #[test]
    fn hash_is_stable_across_repeated_calls(value in payload_value()) {
        let first = hash_canonical(&value).expect("hash");
        let second = hash_canonical(&value).expect("hash");
        assert_eq!(first, second);
    }

    #[test]
    fn any_embedded_float_is_rejected(
        value in payload_value(),
        float in any::<f64>().prop_filter("finite", |f| f.is_finite()),
    ) {
        let mut map = Map::new();
        map.insert("wrapped".to_string(), value);
        map.insert("f".to_string(), Value::from(float));
        let poisoned = Value::Object(map);
        // Integral-valued floats such as 1.0 still serialize as floats in
        // serde_json and are still forbidden on the hashed surface.
        assert!(canonical_bytes(&poisoned).is_err());
    }
}
