// crates/abraxas-runtime/tests/tick.rs
// ============================================================================
// Module: Tick Orchestrator Tests
// Description: Verifies the emitted artifact graph of one tick.
// ============================================================================
//! ## Overview
//! A trivial forecast tick must emit TrendPack, ResultsPack, ViewPack,
//! RunIndex, and RunHeader at their canonical paths with linked hashes;
//! shadow tasks run after the forecast lane sorted by name; and task
//! failures stay local to their event.

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

mod common;

use abraxas_core::TaskStatus;
use abraxas_runtime::TickParams;
use abraxas_runtime::load_trendpack;
use abraxas_runtime::read_manifest;
use abraxas_runtime::run_pipeline_tick;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn trivial_forecast_tick_emits_the_artifact_graph() {
    let dir = TempDir::new().expect("tempdir");
    let bindings = common::stub_bindings();
    let outcome = run_pipeline_tick(&TickParams {
        tick: 0,
        run_id: "seal",
        mode: "sandbox",
        context: &json!({"x": 1}),
        artifacts_dir: dir.path(),
        bindings: &bindings,
    })
    .expect("tick");

    assert_eq!(outcome.artifacts.trendpack, "viz/seal/000000.trendpack.json");
    assert_eq!(outcome.artifacts.results_pack, "results/seal/000000.resultspack.json");
    assert_eq!(outcome.artifacts.runindex, "run_index/seal/000000.runindex.json");
    assert_eq!(outcome.artifacts.viewpack, "view/seal/000000.viewpack.json");
    assert_eq!(outcome.artifacts.run_header, "runs/seal.runheader.json");

    for rel in [
        &outcome.artifacts.trendpack,
        &outcome.artifacts.results_pack,
        &outcome.artifacts.runindex,
        &outcome.artifacts.viewpack,
        &outcome.artifacts.run_header,
    ] {
        assert!(dir.path().join(rel).exists(), "missing {rel}");
    }

    let trendpack =
        load_trendpack(&dir.path().join(&outcome.artifacts.trendpack)).expect("trendpack");
    let lanes: Vec<&str> = trendpack["timeline"]
        .as_array()
        .expect("timeline")
        .iter()
        .map(|e| e["lane"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(lanes, vec!["forecast", "forecast", "forecast"]);
    assert_eq!(trendpack["stats"]["total_events"], 3);
    assert_eq!(trendpack["stats"]["ok_events"], 3);
    assert_eq!(trendpack["stats"]["errors"], 0);
    assert_eq!(trendpack["budget"]["forecast"]["spent_ops"], 30);
    assert_eq!(trendpack["provenance"]["policy_ref"]["schema"], "PolicyRef.v0");

    // Remaining budgets: 50 - 3*10 forecast, untouched shadow.
    assert_eq!(outcome.remaining.forecast.ops, 20);
    assert_eq!(outcome.remaining.shadow.ops, 20);

    // The run index links every artifact hash.
    let index: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join(&outcome.artifacts.runindex)).expect("read"),
    )
    .expect("parse");
    assert_eq!(index["hashes"]["trendpack_sha256"], outcome.artifacts.trendpack_sha256.as_str());
    assert_eq!(
        index["hashes"]["run_header_sha256"],
        outcome.artifacts.run_header_sha256.as_str()
    );
    assert_eq!(index["refs"]["results_pack"], outcome.artifacts.results_pack.as_str());

    // The manifest ledger recorded every per-tick artifact.
    let ledger = read_manifest(&dir.path().join("manifests/seal.manifest.json")).expect("ledger");
    assert_eq!(ledger.records.len(), 4);
}

#[test]
fn shadow_tasks_run_after_forecast_sorted_by_name() {
    let dir = TempDir::new().expect("tempdir");
    let bindings = common::shadow_bindings();
    let outcome = run_pipeline_tick(&TickParams {
        tick: 0,
        run_id: "seal",
        mode: "sandbox",
        context: &json!({"x": 1}),
        artifacts_dir: dir.path(),
        bindings: &bindings,
    })
    .expect("tick");

    let trendpack =
        load_trendpack(&dir.path().join(&outcome.artifacts.trendpack)).expect("trendpack");
    let tasks: Vec<&str> = trendpack["timeline"]
        .as_array()
        .expect("timeline")
        .iter()
        .map(|e| e["task"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(tasks, vec![
        "oracle:signal",
        "oracle:compress",
        "oracle:overlay",
        "shadow:anagram",
        "shadow:sei",
    ]);
    assert_eq!(trendpack["stats"]["shadow_events"], 2);
    assert_eq!(trendpack["budget"]["shadow"]["spent_ops"], 4);

    // Every event carries a result reference into the results pack.
    for event in trendpack["timeline"].as_array().expect("timeline") {
        let reference = &event["meta"]["result_ref"];
        assert_eq!(reference["schema"], "ResultRef.v0");
        assert_eq!(reference["results_pack"], outcome.artifacts.results_pack.as_str());
    }
}

#[test]
fn task_failures_stay_local_to_their_event() {
    let dir = TempDir::new().expect("tempdir");
    let bindings = common::failing_overlay_bindings();
    let outcome = run_pipeline_tick(&TickParams {
        tick: 2,
        run_id: "seal",
        mode: "sandbox",
        context: &json!({}),
        artifacts_dir: dir.path(),
        bindings: &bindings,
    })
    .expect("tick");

    assert_eq!(outcome.results["oracle:overlay"].status, TaskStatus::Error);
    assert_eq!(
        outcome.results["oracle:overlay"].error.as_deref(),
        Some("OverlayError: overlay backend unavailable")
    );
    assert_eq!(outcome.results["oracle:signal"].status, TaskStatus::Ok);

    let trendpack =
        load_trendpack(&dir.path().join(&outcome.artifacts.trendpack)).expect("trendpack");
    assert_eq!(trendpack["stats"]["errors"], 1);
    assert_eq!(trendpack["errors"][0]["task"], "oracle:overlay");

    // The view pack resolves the failing event.
    let view: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join(&outcome.artifacts.viewpack)).expect("read"),
    )
    .expect("parse");
    assert_eq!(view["resolved_filter"]["actual_count"], 1);
    assert_eq!(view["resolved"][0]["event"]["task"], "oracle:overlay");
    assert_eq!(view["resolved"][0]["result"]["error"], "OverlayError: overlay backend unavailable");
    // References inside the view pack carry no pack paths.
    assert!(view["resolved"][0]["ref"].get("results_pack").is_none());
}

#[test]
fn rerunning_a_tick_is_idempotent_by_content() {
    let dir = TempDir::new().expect("tempdir");
    let bindings = common::stub_bindings();
    let params = TickParams {
        tick: 0,
        run_id: "seal",
        mode: "sandbox",
        context: &json!({"x": 1}),
        artifacts_dir: dir.path(),
        bindings: &bindings,
    };
    let first = run_pipeline_tick(&params).expect("first tick");
    let second = run_pipeline_tick(&params).expect("second tick");

    assert_eq!(first.artifacts.trendpack_sha256, second.artifacts.trendpack_sha256);
    assert_eq!(first.artifacts.results_pack_sha256, second.artifacts.results_pack_sha256);
    assert_eq!(first.artifacts.run_header_sha256, second.artifacts.run_header_sha256);
    assert_eq!(first.artifacts.runindex_sha256, second.artifacts.runindex_sha256);
}
