// crates/abraxas-runtime/tests/viewpack.rs
// ============================================================================
// Module: ViewPack and Resolver Tests
// Description: Verifies self-contained overview packs and ref resolution.
// ============================================================================
//! ## Overview
//! The ViewPack must embed aggregates and badges without leaking result
//! reference paths, and the resolver must merge timeline events with their
//! task results reading each ResultsPack once.

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

use abraxas_runtime::InvarianceSummary;
use abraxas_runtime::Resolver;
use abraxas_runtime::StabilitySummary;
use abraxas_runtime::TickParams;
use abraxas_runtime::ViewPackParams;
use abraxas_runtime::build_view_pack;
use abraxas_runtime::run_pipeline_tick;
use serde_json::json;
use tempfile::TempDir;

#[test]
fn resolver_merges_events_with_their_results() {
    let dir = TempDir::new().expect("tempdir");
    let bindings = common::shadow_bindings();
    let outcome = run_pipeline_tick(&TickParams {
        tick: 0,
        run_id: "r1",
        mode: "sandbox",
        context: &json!({}),
        artifacts_dir: dir.path(),
        bindings: &bindings,
    })
    .expect("tick");

    let mut resolver = Resolver::new(dir.path());
    let rows = resolver
        .resolve_trendpack_events(&outcome.artifacts.trendpack, None)
        .expect("resolve");
    assert_eq!(rows.len(), 5);
    for row in &rows {
        assert!(row.result.is_some(), "event {:?} did not resolve", row.event["task"]);
    }
    assert_eq!(rows[0].result.as_ref().expect("result")["value"], json!({"signal": 1}));

    let limited = resolver
        .resolve_trendpack_events(&outcome.artifacts.trendpack, Some(2))
        .expect("resolve limited");
    assert_eq!(limited.len(), 2);
}

#[test]
fn view_pack_embeds_badges_and_strips_reference_paths() {
    let dir = TempDir::new().expect("tempdir");
    let bindings = common::stub_bindings();
    let outcome = run_pipeline_tick(&TickParams {
        tick: 0,
        run_id: "r1",
        mode: "sandbox",
        context: &json!({}),
        artifacts_dir: dir.path(),
        bindings: &bindings,
    })
    .expect("tick");

    let view = build_view_pack(dir.path(), &outcome.artifacts.trendpack, &ViewPackParams {
        run_id: "r1",
        tick: 0,
        mode: "sandbox",
        resolve_limit: 50,
        resolve_only_status: None,
        invariance: Some(InvarianceSummary {
            schema: "InvarianceSummary.v0".to_string(),
            trendpack_sha256: outcome.artifacts.trendpack_sha256.clone(),
            runheader_sha256: outcome.artifacts.run_header_sha256.clone(),
            passed: true,
        }),
        stability_summary: Some(StabilitySummary {
            schema: "StabilitySummary.v0".to_string(),
            ok: true,
            first_mismatch_run: None,
            divergence_kind: None,
        }),
        provenance: json!({"engine": "abraxas"}),
    })
    .expect("view pack");

    assert_eq!(view.schema, "ViewPack.v0");
    assert_eq!(view.aggregates["invariance"]["passed"], true);
    assert_eq!(view.aggregates["stability_summary"]["ok"], true);
    assert_eq!(view.aggregates["stats"]["total_events"], 3);

    // No result reference paths anywhere in the pack.
    for event in &view.events {
        assert!(event["meta"].get("result_ref").is_none());
    }
    assert_eq!(view.resolved.len(), 3, "no status filter resolves every event");
    for entry in &view.resolved {
        assert!(entry["ref"].get("results_pack").is_none());
    }
    assert_eq!(view.resolved_filter["actual_count"], 3);
}
