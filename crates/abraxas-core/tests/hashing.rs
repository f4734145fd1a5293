// crates/abraxas-core/tests/hashing.rs
// ============================================================================
// Module: Canonical Hashing Tests
// Description: Verifies canonical JSON hashing behavior.
// ============================================================================
//! ## Overview
//! Ensures canonical JSON hashing is deterministic across key ordering and
//! numeric normalization, and rejects non-finite floats.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use abraxas_core::hashing::canonical_json_bytes;
use abraxas_core::hashing::canonical_json_string;
use abraxas_core::hashing::hash_canonical_json;
use abraxas_core::hashing::sha256_hex;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

#[test]
fn canonical_hash_is_order_independent_for_maps() {
    let mut map_a = Map::new();
    map_a.insert("b".to_string(), json!(2));
    map_a.insert("a".to_string(), json!(1));

    let mut map_b = Map::new();
    map_b.insert("a".to_string(), json!(1));
    map_b.insert("b".to_string(), json!(2));

    let hash_a = hash_canonical_json(&Value::Object(map_a)).expect("hash a");
    let hash_b = hash_canonical_json(&Value::Object(map_b)).expect("hash b");

    assert_eq!(hash_a, hash_b);
}

#[test]
fn canonical_bytes_sort_keys_and_drop_whitespace() {
    let value = json!({"b": 1, "a": [1, 2], "c": {"z": null, "y": "x"}});
    let bytes = canonical_json_bytes(&value).expect("canonical bytes");
    assert_eq!(bytes, br#"{"a":[1,2],"b":1,"c":{"y":"x","z":null}}"#);
}

#[test]
fn canonical_hash_normalizes_numeric_representation() {
    let hash_a = hash_canonical_json(&json!(1.0)).expect("hash a");
    let hash_b = hash_canonical_json(&json!(1)).expect("hash b");
    assert_eq!(hash_a, hash_b);
}

#[test]
fn canonical_string_uses_shortest_round_trip_floats() {
    let rendered = canonical_json_string(&json!({"v": 0.5})).expect("canonical string");
    assert_eq!(rendered, r#"{"v":0.5}"#);
}

#[derive(Serialize)]
struct FloatWrapper {
    value: f64,
}

#[test]
fn canonical_hash_rejects_nan() {
    let value = FloatWrapper {
        value: f64::NAN,
    };
    assert!(hash_canonical_json(&value).is_err());
}

#[test]
fn canonical_hash_rejects_infinity() {
    let value = FloatWrapper {
        value: f64::INFINITY,
    };
    assert!(hash_canonical_json(&value).is_err());
}

#[test]
fn canonical_hash_rejects_negative_infinity() {
    let value = FloatWrapper {
        value: f64::NEG_INFINITY,
    };
    assert!(hash_canonical_json(&value).is_err());
}

// ============================================================================
// SECTION: Golden SHA-256 Tests (Known-Value Verification)
// ============================================================================

#[test]
fn golden_hash_empty_object() {
    // SHA-256 of "{}"
    let digest = hash_canonical_json(&json!({})).expect("hash");
    assert_eq!(digest, "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a");
}

#[test]
fn golden_hash_empty_array() {
    // SHA-256 of "[]"
    let digest = hash_canonical_json(&json!([])).expect("hash");
    assert_eq!(digest, "4f53cda18c2baa0c0354bb5f9a3ecbe5ed12ab4d8e11ba873c2f11161202b945");
}

#[test]
fn golden_hash_integer_one() {
    // SHA-256 of "1"
    let digest = hash_canonical_json(&json!(1)).expect("hash");
    assert_eq!(digest, "6b86b273ff34fce19d6b804eff5a3f5747ada4eaa22f1d49c01e52ddb7875b4b");
}

#[test]
fn golden_hash_boolean_true() {
    // SHA-256 of "true"
    let digest = hash_canonical_json(&json!(true)).expect("hash");
    assert_eq!(digest, "b5bea41b6c623f7c09f1bf24dcae58ebab3c0cdd90ad966bc43a45b44867e12b");
}

#[test]
fn golden_hash_boolean_false() {
    // SHA-256 of "false"
    let digest = hash_canonical_json(&json!(false)).expect("hash");
    assert_eq!(digest, "fcbcf165908dd18a9e49f7ff27810176db8e9f63b4352213741664245224f8aa");
}

#[test]
fn golden_hash_null() {
    // SHA-256 of "null"
    let digest = hash_canonical_json(&json!(null)).expect("hash");
    assert_eq!(digest, "74234e98afe7498fb5daf1f36ac2d78acc339464f950703b8c019892f982b90b");
}

#[test]
fn golden_hash_bytes_direct() {
    // SHA-256 of "test"
    let digest = sha256_hex(b"test");
    assert_eq!(digest, "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08");
}

#[test]
fn golden_hash_empty_bytes() {
    // SHA-256 of empty input
    let digest = sha256_hex(b"");
    assert_eq!(digest, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
}

// ============================================================================
// SECTION: Robustness Tests
// ============================================================================

#[test]
fn hash_deeply_nested_structure() {
    let mut value = json!({});
    for i in 0 .. 100 {
        value = json!({ format!("level{i}"): value });
    }
    assert!(hash_canonical_json(&value).is_ok());
}

#[test]
fn hash_unicode_strings() {
    let value = json!({"emoji": "Hello, 世界! 🎉"});
    assert!(hash_canonical_json(&value).is_ok());
}

#[test]
fn hash_consistency_across_calls() {
    let value = json!({"a": 1, "b": [1, 2, 3], "c": {"nested": true}});
    let hash1 = hash_canonical_json(&value).expect("hash1");
    let hash2 = hash_canonical_json(&value).expect("hash2");
    assert_eq!(hash1, hash2, "Hash must be deterministic");
}

#[test]
fn hash_produces_lowercase_hex() {
    let digest = sha256_hex(&[0xAB, 0xCD, 0xEF, 0x12]);
    assert!(!digest.chars().any(char::is_uppercase), "No uppercase chars allowed");
    assert_eq!(digest.len(), 64);
}
