// crates/abraxas-core/tests/work_units.rs
// ============================================================================
// Module: Work Unit Tests
// Description: Verifies deterministic work unit identity and key ordering.
// ============================================================================
//! ## Overview
//! Unit identity must be a pure function of the five identity fields, and the
//! ordering key must totally order units within a stage.

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

use abraxas_core::OrderingKey;
use abraxas_core::Stage;
use abraxas_core::WindowUtc;
use abraxas_core::WorkUnit;
use serde_json::json;

/// Builds a FETCH unit for the given URL.
fn fetch_unit(url: &str, bytes: u64) -> WorkUnit {
    WorkUnit::build(
        Stage::Fetch,
        "S1",
        WindowUtc::new(Some("2025-01-01T00:00:00Z".to_string()), None),
        OrderingKey::new(vec![
            "S1".to_string(),
            "2025-01-01T00:00:00Z".to_string(),
            url.to_string(),
        ]),
        json!({"url": url}),
        bytes,
    )
    .expect("build unit")
}

#[test]
fn identical_identity_fields_yield_equal_unit_ids() {
    let a = fetch_unit("https://example.com/a", 10);
    let b = fetch_unit("https://example.com/a", 999);
    // input_bytes is not part of identity.
    assert_eq!(a.unit_id, b.unit_id);
}

#[test]
fn different_urls_yield_different_unit_ids() {
    let a = fetch_unit("https://example.com/a", 10);
    let b = fetch_unit("https://example.com/b", 10);
    assert_ne!(a.unit_id, b.unit_id);
}

#[test]
fn unit_id_is_a_lowercase_sha256() {
    let unit = fetch_unit("https://example.com/a", 0);
    assert_eq!(unit.unit_id.len(), 64);
    assert!(unit.unit_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
}

#[test]
fn ordering_keys_sort_lexicographically() {
    let mut keys = vec![
        OrderingKey::new(vec!["S1".to_string(), "t".to_string(), "https://b".to_string()]),
        OrderingKey::new(vec!["S1".to_string(), "t".to_string(), "https://a".to_string()]),
        OrderingKey::new(vec!["S0".to_string(), "t".to_string(), "https://z".to_string()]),
    ];
    keys.sort();
    assert_eq!(keys[0].components()[0], "S0");
    assert_eq!(keys[1].components()[2], "https://a");
    assert_eq!(keys[2].components()[2], "https://b");
}

#[test]
fn stage_serializes_to_screaming_case() {
    assert_eq!(serde_json::to_value(Stage::Fetch).expect("serialize"), json!("FETCH"));
    assert_eq!(serde_json::to_value(Stage::Parse).expect("serialize"), json!("PARSE"));
}
