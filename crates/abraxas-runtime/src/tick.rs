// crates/abraxas-runtime/src/tick.rs
// ============================================================================
// Module: Tick Orchestrator
// Description: Canonical stitch-point between scheduler and artifact graph.
// Purpose: Run one budgeted tick and emit the hash-linked artifact set.
// Dependencies: abraxas-core, crate::{artifacts, policy, results, run_header,
// trendpack, viewpack}, tracing
// ============================================================================

//! ## Overview
//! The orchestrator is the only layer that legitimately knows what executed
//! (the trace), the run identity (`run_id`/`tick`/`mode`), and where
//! artifacts live. Each tick it snapshots the retention policy, runs the
//! scheduler under the declared budgets, and writes ResultsPack, TrendPack
//! (with result references attached), RunHeader (write-once), ViewPack, and
//! RunIndex at their canonical paths. All artifact-internal references are
//! artifacts-dir-relative, which is what lets isolated runs hash
//! identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use abraxas_core::Budget;
use abraxas_core::DeterministicScheduler;
use abraxas_core::Lane;
use abraxas_core::PipelineBindings;
use abraxas_core::RemainingBudgets;
use abraxas_core::TaskContext;
use abraxas_core::TaskResult;
use abraxas_core::TaskSpec;
use abraxas_core::TaskStatus;
use abraxas_core::bind_callable;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::artifacts::ArtifactSpec;
use crate::artifacts::ArtifactWriter;
use crate::error::RuntimeError;
use crate::policy::ensure_policy_snapshot;
use crate::policy::policy_ref_from_snapshot;
use crate::results::build_results_pack;
use crate::results::make_result_ref;
use crate::run_header::ensure_run_header;
use crate::trendpack::build_trendpack;
use crate::viewpack::ViewPackParams;
use crate::viewpack::build_view_pack;

// ============================================================================
// SECTION: Budget Constants
// ============================================================================

/// Forecast-lane budget per tick.
pub const FORECAST_BUDGET: Budget = Budget::new(50, 0);

/// Shadow-lane budget per tick.
pub const SHADOW_BUDGET: Budget = Budget::new(20, 0);

/// Declared ops cost of each forecast task.
pub const FORECAST_TASK_COST: i64 = 10;

/// Declared ops cost of each shadow task.
pub const SHADOW_TASK_COST: i64 = 2;

// ============================================================================
// SECTION: Tick Output
// ============================================================================

/// Relative paths and hashes of one tick's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickArtifacts {
    /// TrendPack path, artifacts-dir-relative.
    pub trendpack: String,
    /// TrendPack content hash.
    pub trendpack_sha256: String,
    /// ResultsPack path, artifacts-dir-relative.
    pub results_pack: String,
    /// ResultsPack content hash.
    pub results_pack_sha256: String,
    /// RunIndex path, artifacts-dir-relative.
    pub runindex: String,
    /// RunIndex content hash.
    pub runindex_sha256: String,
    /// ViewPack path, artifacts-dir-relative.
    pub viewpack: String,
    /// ViewPack content hash.
    pub viewpack_sha256: String,
    /// RunHeader path, artifacts-dir-relative.
    pub run_header: String,
    /// RunHeader content hash.
    pub run_header_sha256: String,
}

/// Structured output of one orchestrated tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Tick number.
    pub tick: u64,
    /// Run identifier.
    pub run_id: String,
    /// Execution mode label.
    pub mode: String,
    /// Task results keyed by name.
    pub results: BTreeMap<String, TaskResult>,
    /// Per-lane budgets remaining after the tick.
    pub remaining: RemainingBudgets,
    /// Written artifact paths and hashes.
    pub artifacts: TickArtifacts,
}

/// Parameters for one orchestrated tick.
pub struct TickParams<'a> {
    /// Tick number.
    pub tick: u64,
    /// Run identifier.
    pub run_id: &'a str,
    /// Execution mode label.
    pub mode: &'a str,
    /// Context value handed to every task.
    pub context: &'a TaskContext,
    /// Artifacts root directory.
    pub artifacts_dir: &'a Path,
    /// Resolved pipeline bindings.
    pub bindings: &'a PipelineBindings,
}

// ============================================================================
// SECTION: Orchestration
// ============================================================================

/// Builds the scheduler task set from resolved bindings.
fn build_tasks(bindings: &PipelineBindings) -> Vec<TaskSpec> {
    let mut tasks: Vec<TaskSpec> = vec![
        bind_callable(
            "oracle:signal",
            Lane::Forecast,
            0,
            FORECAST_TASK_COST,
            bindings.run_signal.clone(),
        ),
        bind_callable(
            "oracle:compress",
            Lane::Forecast,
            1,
            FORECAST_TASK_COST,
            bindings.run_compress.clone(),
        ),
        bind_callable(
            "oracle:overlay",
            Lane::Forecast,
            2,
            FORECAST_TASK_COST,
            bindings.run_overlay.clone(),
        ),
    ];
    // BTreeMap iteration yields the stable name ordering for the shadow lane.
    for (name, task_fn) in &bindings.shadow_tasks {
        tasks.push(bind_callable(
            format!("shadow:{name}"),
            Lane::Shadow,
            0,
            SHADOW_TASK_COST,
            task_fn.clone(),
        ));
    }
    tasks
}

/// Runs one canonical tick and emits the artifact graph.
///
/// # Errors
///
/// Returns [`RuntimeError`] when scheduling setup or any artifact write
/// fails. Task failures inside the tick are recorded in the trace and never
/// surface as errors here.
pub fn run_pipeline_tick(params: &TickParams<'_>) -> Result<TickOutcome, RuntimeError> {
    let tick = params.tick;
    let run_id = params.run_id;
    let mode = params.mode;
    let context = params.context;
    let artifacts_dir = params.artifacts_dir;
    let bindings = params.bindings;

    // Policy snapshot first: the tick's provenance points at an immutable
    // snapshot even if the mutable policy file changes mid-run.
    let policy_path = artifacts_dir.join("policy").join("retention.json");
    let (snapshot_path, snapshot_sha256) =
        ensure_policy_snapshot(artifacts_dir, run_id, "retention", &policy_path)?;
    let policy_ref = policy_ref_from_snapshot("retention", &snapshot_path, &snapshot_sha256);

    let mut scheduler = DeterministicScheduler::new();
    for task in build_tasks(bindings) {
        scheduler.add(task)?;
    }

    let out = scheduler.run_tick(tick, FORECAST_BUDGET, SHADOW_BUDGET, context);
    tracing::info!(run_id, tick, events = out.trace.len(), "tick executed");

    let provenance = json!({
        "engine": "abraxas",
        "mode": mode,
        "scheduler": "v0.2",
        "policy_ref": &policy_ref,
    });

    let writer = ArtifactWriter::new(artifacts_dir);

    // ResultsPack first: TrendPack events reference it by relative path.
    let results_rel = format!("results/{run_id}/{tick:06}.resultspack.json");
    let results_pack = build_results_pack(run_id, tick, &out.results, provenance.clone());
    let results_rec = writer.write_json(
        &ArtifactSpec {
            run_id: (*run_id).to_string(),
            tick,
            kind: "resultspack".to_string(),
            schema: "ResultsPack.v0".to_string(),
            rel_path: results_rel.clone(),
            extra: None,
        },
        &results_pack,
    )?;

    let mut trendpack = build_trendpack(&out.trace, run_id, tick, provenance.clone());
    for event in &mut trendpack.timeline {
        let result_ref = make_result_ref(&results_rel, &event.task);
        let result_ref =
            serde_json::to_value(&result_ref).map_err(abraxas_core::CanonicalError::Encode)?;
        event.meta.insert("result_ref".to_string(), result_ref);
    }
    let trend_rel = format!("viz/{run_id}/{tick:06}.trendpack.json");
    let trend_rec = writer.write_json(
        &ArtifactSpec {
            run_id: (*run_id).to_string(),
            tick,
            kind: "trendpack".to_string(),
            schema: "TrendPack.v0".to_string(),
            rel_path: trend_rel.clone(),
            extra: Some(
                json!({ "mode": mode, "scheduler": "v0.2" })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            ),
        },
        &trendpack,
    )?;

    let (_, header_sha256) = ensure_run_header(
        artifacts_dir,
        run_id,
        mode,
        &bindings.provenance,
        &json!({ "retention": &policy_ref }),
        None,
    )?;
    let header_rel = format!("runs/{run_id}.runheader.json");

    let view_rel = format!("view/{run_id}/{tick:06}.viewpack.json");
    let view_pack = build_view_pack(artifacts_dir, &trend_rel, &ViewPackParams {
        run_id,
        tick,
        mode,
        resolve_limit: 50,
        resolve_only_status: Some(vec![TaskStatus::Error, TaskStatus::SkippedBudget]),
        invariance: None,
        stability_summary: None,
        provenance: provenance.clone(),
    })?;
    let view_rec = writer.write_json(
        &ArtifactSpec {
            run_id: (*run_id).to_string(),
            tick,
            kind: "viewpack".to_string(),
            schema: "ViewPack.v0".to_string(),
            rel_path: view_rel.clone(),
            extra: None,
        },
        &view_pack,
    )?;

    let runindex = json!({
        "schema": "RunIndex.v0",
        "run_id": run_id,
        "tick": tick,
        "refs": {
            "trendpack": &trend_rel,
            "results_pack": &results_rel,
            "run_header": &header_rel,
            "viewpack": &view_rel,
        },
        "hashes": {
            "trendpack_sha256": &trend_rec.sha256,
            "results_pack_sha256": &results_rec.sha256,
            "run_header_sha256": &header_sha256,
            "viewpack_sha256": &view_rec.sha256,
        },
        "tags": [],
        "provenance": &provenance,
    });
    let index_rel = format!("run_index/{run_id}/{tick:06}.runindex.json");
    let index_rec = writer.write_json(
        &ArtifactSpec {
            run_id: (*run_id).to_string(),
            tick,
            kind: "runindex".to_string(),
            schema: "RunIndex.v0".to_string(),
            rel_path: index_rel.clone(),
            extra: Some(
                json!({ "mode": mode }).as_object().cloned().unwrap_or_default(),
            ),
        },
        &runindex,
    )?;

    Ok(TickOutcome {
        tick,
        run_id: (*run_id).to_string(),
        mode: (*mode).to_string(),
        results: out.results,
        remaining: out.remaining,
        artifacts: TickArtifacts {
            trendpack: trend_rel,
            trendpack_sha256: trend_rec.sha256,
            results_pack: results_rel,
            results_pack_sha256: results_rec.sha256,
            runindex: index_rel,
            runindex_sha256: index_rec.sha256,
            viewpack: view_rel,
            viewpack_sha256: view_rec.sha256,
            run_header: header_rel,
            run_header_sha256: header_sha256,
        },
    })
}
