// crates/abraxas-validate/tests/seal.rs
// ============================================================================
// Module: Seal Report Tests
// Description: Verifies the rolled-up release verdict artifact.
// ============================================================================
//! ## Overview
//! The seal report passes only when validation and the gate both pass, and
//! its bytes are deterministic for identical inputs.

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

use abraxas_runtime::DozenRunGateResult;
use abraxas_validate::SealInputs;
use abraxas_validate::ValidationResult;
use abraxas_validate::write_seal_report;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

/// Gate result with the given verdict.
fn gate_result(ok: bool) -> DozenRunGateResult {
    DozenRunGateResult {
        ok,
        expected_trendpack_sha256: Some("aa".repeat(32)),
        trendpack_sha256s: vec!["aa".repeat(32); 12],
        expected_runheader_sha256: Some("bb".repeat(32)),
        runheader_sha256s: vec!["bb".repeat(32); 12],
        first_mismatch_run: if ok { None } else { Some(1) },
        divergence: None,
    }
}

/// Validation result with the given verdict.
fn validation_result(ok: bool) -> ValidationResult {
    ValidationResult {
        ok,
        validated_ticks: vec![0],
        failures: Vec::new(),
    }
}

#[test]
fn seal_passes_only_when_both_gates_pass() {
    for (validation_ok, gate_ok, expected) in
        [(true, true, true), (true, false, false), (false, true, false)]
    {
        let dir = TempDir::new().expect("tempdir");
        let validation = validation_result(validation_ok);
        let gate = gate_result(gate_ok);
        let (path, _) = write_seal_report(dir.path(), "seal", &SealInputs {
            version: "0.1.0",
            version_pack: json!({"schema": "AbraxasVersionPack.v0", "abraxas": "0.1.0"}),
            seal_tick_artifacts: json!({}),
            validation_result: &validation,
            dozen_gate_result: &gate,
        })
        .expect("write report");

        let report: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(report["schema"], "SealReport.v0");
        assert_eq!(report["ok"], expected, "validation={validation_ok} gate={gate_ok}");
    }
}

#[test]
fn seal_report_bytes_are_deterministic() {
    let first_dir = TempDir::new().expect("tempdir");
    let second_dir = TempDir::new().expect("tempdir");
    let validation = validation_result(true);
    let gate = gate_result(true);
    let inputs = SealInputs {
        version: "0.1.0",
        version_pack: json!({"schema": "AbraxasVersionPack.v0", "abraxas": "0.1.0"}),
        seal_tick_artifacts: json!({"trendpack": "viz/seal/000000.trendpack.json"}),
        validation_result: &validation,
        dozen_gate_result: &gate,
    };

    let (_, first_sha) = write_seal_report(first_dir.path(), "seal", &inputs).expect("first");
    let (_, second_sha) = write_seal_report(second_dir.path(), "seal", &inputs).expect("second");
    assert_eq!(first_sha, second_sha);
}
