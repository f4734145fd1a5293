// crates/abraxas-runtime/tests/run_header.rs
// ============================================================================
// Module: RunHeader Tests
// Description: Verifies the write-once contract and hash verification.
// ============================================================================
//! ## Overview
//! Once a run header exists it is trusted: repeated ensures return the
//! existing path and hash unchanged, even when the inputs change.

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

use abraxas_runtime::ensure_run_header;
use abraxas_runtime::load_run_header;
use abraxas_runtime::verify_run_header;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn run_header_is_write_once() {
    let dir = TempDir::new().expect("tempdir");
    let bindings = json!({"bindings": "PipelineBindings.v0"});
    let refs = json!({"retention": {"schema": "PolicyRef.v0"}});

    let first = ensure_run_header(dir.path(), "r1", "sandbox", &bindings, &refs, None)
        .expect("first ensure");
    // Different inputs on the second call must not rewrite the header.
    let second = ensure_run_header(
        dir.path(),
        "r1",
        "live",
        &json!({"bindings": "other"}),
        &json!({}),
        None,
    )
    .expect("second ensure");

    assert_eq!(first, second);

    let header = load_run_header(&first.0).expect("load");
    assert_eq!(header["mode"], "sandbox");
    assert_eq!(header["stability_ref_pattern"], "runs/r1.stability_ref.json");
    assert!(header["env"]["platform"]["os"].is_string());
}

#[test]
fn header_hash_verification_detects_tampering() {
    let dir = TempDir::new().expect("tempdir");
    let (path, sha) =
        ensure_run_header(dir.path(), "r1", "sandbox", &json!({}), &json!({}), None)
            .expect("ensure");

    let clean = verify_run_header(&path, &sha);
    assert!(clean.valid, "{}", clean.reason);

    std::fs::write(&path, b"{}").expect("tamper");
    let tampered = verify_run_header(&path, &sha);
    assert!(!tampered.valid);
    assert!(tampered.actual_sha256.is_some());
}

#[test]
fn missing_header_fails_verification_with_reason() {
    let dir = TempDir::new().expect("tempdir");
    let absent = dir.path().join("runs/none.runheader.json");
    let outcome = verify_run_header(&absent, "00");
    assert!(!outcome.valid);
    assert!(outcome.actual_sha256.is_none());
    assert!(outcome.reason.contains("missing"));
}
