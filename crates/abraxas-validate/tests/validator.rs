// crates/abraxas-validate/tests/validator.rs
// ============================================================================
// Module: Artifact Validation Tests
// Description: Verifies a fresh tick validates and corruption is reported.
// ============================================================================
//! ## Overview
//! A freshly emitted tick must pass validation with zero failures. Corrupt
//! or cross-linked-wrong artifacts must surface as structured failures with
//! their kind and path, never as panics.

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

use std::collections::BTreeMap;
use std::sync::Arc;

use abraxas_core::BindingRegistry;
use abraxas_core::PipelineFn;
use abraxas_core::TaskOutput;
use abraxas_core::resolve_pipeline_bindings;
use abraxas_runtime::TickParams;
use abraxas_runtime::run_pipeline_tick;
use abraxas_validate::ArtifactKind;
use abraxas_validate::validate_artifact;
use abraxas_validate::validate_run;
use abraxas_validate::validate_tick;
use serde_json::json;
use tempfile::TempDir;

/// Deterministic bindings with one shadow task.
fn bindings() -> abraxas_core::PipelineBindings {
    let constant = |value: serde_json::Value| -> PipelineFn {
        Arc::new(move |_ctx| Ok(TaskOutput::Value(value.clone())))
    };
    let mut registry = BindingRegistry::new();
    registry.register("abraxas_oracle::registry", "run_signal", constant(json!({"signal": 1})));
    registry.register(
        "abraxas_oracle::registry",
        "run_compress",
        constant(json!({"compress": 1})),
    );
    registry.register("abraxas_oracle::registry", "run_overlay", constant(json!({"overlay": 1})));
    registry.register_shadow_provider(
        "abraxas_detectors::shadow_registry",
        "shadow_tasks",
        Arc::new(move || {
            let mut tasks: BTreeMap<String, PipelineFn> = BTreeMap::new();
            tasks.insert(
                "sei".to_string(),
                Arc::new(move |_ctx| Ok(TaskOutput::Value(json!({"sei": 0})))),
            );
            tasks
        }),
    );
    resolve_pipeline_bindings(&registry).expect("resolve")
}

#[test]
fn fresh_tick_passes_validation_with_zero_failures() {
    let dir = TempDir::new().expect("tempdir");
    run_pipeline_tick(&TickParams {
        tick: 0,
        run_id: "seal",
        mode: "sandbox",
        context: &json!({"x": 1}),
        artifacts_dir: dir.path(),
        bindings: &bindings(),
    })
    .expect("tick");

    let outcome = validate_tick(dir.path(), "seal", 0);
    assert!(outcome.ok, "failures: {:?}", outcome.failures);

    let run_outcome = validate_run(dir.path(), "seal", None);
    assert!(run_outcome.ok, "failures: {:?}", run_outcome.failures);
    assert_eq!(run_outcome.validated_ticks, vec![0]);
}

#[test]
fn missing_run_index_short_circuits_the_tick() {
    let dir = TempDir::new().expect("tempdir");
    let outcome = validate_tick(dir.path(), "seal", 0);
    assert!(!outcome.ok);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].artifact_kind, "RunIndex.v0");
}

#[test]
fn schema_violations_are_reported_with_messages() {
    let dir = TempDir::new().expect("tempdir");
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"schema": "RunIndex.v0", "run_id": 7}"#).expect("write");

    let (ok, errors) = validate_artifact(&bad, ArtifactKind::RunIndex);
    assert!(!ok);
    assert!(!errors.is_empty());
}

#[test]
fn tampered_trendpack_fails_run_validation() {
    let dir = TempDir::new().expect("tempdir");
    let outcome = run_pipeline_tick(&TickParams {
        tick: 0,
        run_id: "seal",
        mode: "sandbox",
        context: &json!({}),
        artifacts_dir: dir.path(),
        bindings: &bindings(),
    })
    .expect("tick");

    // Break the version tag of the emitted trendpack.
    let trendpack_path = dir.path().join(&outcome.artifacts.trendpack);
    let mut trendpack: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&trendpack_path).expect("read"))
            .expect("parse");
    trendpack["version"] = json!("TrendPack.v1");
    std::fs::write(&trendpack_path, trendpack.to_string()).expect("rewrite");

    let run_outcome = validate_run(dir.path(), "seal", Some(0));
    assert!(!run_outcome.ok);
    assert!(run_outcome.failures.iter().any(|f| f.artifact_kind == "TrendPack.v0"));
}

#[test]
fn mismatched_result_refs_fail_the_cross_check() {
    let dir = TempDir::new().expect("tempdir");
    let outcome = run_pipeline_tick(&TickParams {
        tick: 0,
        run_id: "seal",
        mode: "sandbox",
        context: &json!({}),
        artifacts_dir: dir.path(),
        bindings: &bindings(),
    })
    .expect("tick");

    // Point one event's result reference at a different pack filename.
    let trendpack_path = dir.path().join(&outcome.artifacts.trendpack);
    let mut trendpack: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&trendpack_path).expect("read"))
            .expect("parse");
    trendpack["timeline"][0]["meta"]["result_ref"]["results_pack"] =
        json!("results/seal/000099.resultspack.json");
    std::fs::write(&trendpack_path, trendpack.to_string()).expect("rewrite");

    let run_outcome = validate_run(dir.path(), "seal", Some(0));
    assert!(!run_outcome.ok);
    assert!(run_outcome.failures.iter().any(|f| {
        f.errors.iter().any(|e| e.contains("filename mismatch"))
    }));
}
