// crates/abraxas-acquisition/src/execute.rs
// ============================================================================
// Module: Plan Execution
// Description: Budgeted execution of bulk pull plans over the CAS.
// Purpose: Fetch plan steps in parallel, commit packets in key order.
// Dependencies: abraxas-cas, abraxas-core, abraxas-executor, abraxas-tuning,
// crate::{perf, plan, transport}, tracing
// ============================================================================

//! ## Overview
//! Plan steps become FETCH work units keyed by `(source_id, window_start,
//! url)` and run through the parallel executor. Offline execution serves
//! steps cache-only and marks misses as skipped; online execution fetches
//! via the bulk path and never invokes the surgical path. After commit
//! ordering, source packets are synthesized in the committed sequence, so
//! for a fixed input set the packet sequence is byte-identical across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use abraxas_cas::CasStore;
use abraxas_core::OrderingKey;
use abraxas_core::Stage;
use abraxas_core::WorkUnit;
use abraxas_executor::ConcurrencyConfig;
use abraxas_executor::WorkResult;
use abraxas_executor::execute_parallel;
use abraxas_tuning::PortfolioTuningIR;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::error::AcquisitionError;
use crate::perf::PerfLedger;
use crate::plan::BulkPullPlan;
use crate::plan::PlanAction;
use crate::transport::Transport;
use crate::transport::acquire_bulk;
use crate::transport::acquire_cache_only;

// ============================================================================
// SECTION: Run Context and Packets
// ============================================================================

/// Explicit run identity and clock handed to acquisition.
///
/// # Invariants
/// - `now_utc` is the only sanctioned time source in acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Run identifier.
    pub run_id: String,
    /// Observation timestamp for the run.
    pub now_utc: String,
}

/// Wire-shaped packet synthesized from a committed fetch.
///
/// # Invariants
/// - Packet order equals executor commit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePacket {
    /// Source the packet was acquired for.
    pub source_id: String,
    /// Observation timestamp from the run context.
    pub observed_at_utc: String,
    /// Window start bound, when set.
    pub window_start_utc: Option<String>,
    /// Window end bound, when set.
    pub window_end_utc: Option<String>,
    /// Payload with the URL, cache reference, and content type.
    pub payload: Value,
    /// Plan and step provenance.
    pub provenance: Value,
    /// Optional data grade label.
    pub data_grade: Option<String>,
}

/// Outcome of executing a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Packets in commit order.
    pub packets: Vec<SourcePacket>,
    /// Cache references of fetched bodies, in commit order.
    pub cache_refs: Vec<Value>,
}

// ============================================================================
// SECTION: Work Units
// ============================================================================

/// Builds FETCH work units from the plan's non-skip steps.
fn build_work_units(plan: &BulkPullPlan) -> Result<Vec<WorkUnit>, AcquisitionError> {
    let mut units: Vec<WorkUnit> = Vec::with_capacity(plan.steps.len());
    for step in &plan.steps {
        if step.action == PlanAction::Skip {
            continue;
        }
        let key = OrderingKey::new(vec![
            plan.source_id.clone(),
            plan.window_utc.start.clone().unwrap_or_default(),
            step.url_or_key.clone(),
        ]);
        let unit = WorkUnit::build(
            Stage::Fetch,
            plan.source_id.clone(),
            plan.window_utc.clone(),
            key,
            json!({ "step_id": step.step_id, "url": step.url_or_key }),
            step.expected_bytes.unwrap_or(0),
        )?;
        units.push(unit);
    }
    units.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(units)
}

/// Executes one work unit against the cache or the bulk transport.
fn execute_unit(
    unit: &WorkUnit,
    plan: &BulkPullPlan,
    run_ctx: &RunContext,
    cas: &CasStore,
    transport: &Transport,
    offline: bool,
) -> Result<WorkResult, AcquisitionError> {
    let step_id = unit.input_refs["step_id"].as_str().unwrap_or_default().to_string();
    let url = unit.input_refs["url"].as_str().unwrap_or_default().to_string();

    if offline {
        let Some(cached) = acquire_cache_only(&url, cas)? else {
            return Ok(WorkResult {
                unit_id: unit.unit_id.clone(),
                key: unit.key.clone(),
                output_refs: json!({ "skipped": true, "step_id": step_id, "url": url }),
                bytes_processed: 0,
                stage: unit.stage,
            });
        };
        return Ok(WorkResult {
            unit_id: unit.unit_id.clone(),
            key: unit.key.clone(),
            output_refs: json!({
                "cache_ref": &cached.raw_ref,
                "method": cached.method,
                "content_type": &cached.content_type,
                "step_id": &step_id,
                "url": &url,
            }),
            bytes_processed: cached.raw_ref.bytes,
            stage: unit.stage,
        });
    }

    let fetched = acquire_bulk(
        transport,
        &url,
        &plan.source_id,
        cas,
        Some(run_ctx.now_utc.as_str()),
    )?;
    Ok(WorkResult {
        unit_id: unit.unit_id.clone(),
        key: unit.key.clone(),
        output_refs: json!({
            "cache_ref": &fetched.raw_ref,
            "method": fetched.method,
            "content_type": &fetched.content_type,
            "step_id": &step_id,
            "url": &url,
        }),
        bytes_processed: fetched.raw_ref.bytes,
        stage: unit.stage,
    })
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Executes a bulk pull plan and synthesizes source packets.
///
/// # Errors
///
/// Propagates transport failures in online mode and CAS or ledger failures
/// in either mode. Offline cache misses are recorded as skips, not errors.
pub fn execute_plan(
    plan: &BulkPullPlan,
    run_ctx: &RunContext,
    budgets: &PortfolioTuningIR,
    cas: &CasStore,
    transport: &Transport,
    perf_ledger: &PerfLedger,
    offline: bool,
) -> Result<ExecutionResult, AcquisitionError> {
    let config = ConcurrencyConfig::from_portfolio(budgets);
    let units = build_work_units(plan)?;
    tracing::info!(
        plan_id = %plan.plan_id,
        steps = units.len(),
        offline,
        "executing bulk pull plan"
    );

    let stage_run = execute_parallel(units, &config, Stage::Fetch, |unit| {
        execute_unit(unit, plan, run_ctx, cas, transport, offline)
    })?;

    let mut packets: Vec<SourcePacket> = Vec::new();
    let mut cache_refs: Vec<Value> = Vec::new();
    for result in &stage_run.results {
        let output = &result.output_refs;
        if output.get("skipped").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        cache_refs.push(output["cache_ref"].clone());
        packets.push(SourcePacket {
            source_id: plan.source_id.clone(),
            observed_at_utc: run_ctx.now_utc.clone(),
            window_start_utc: plan.window_utc.start.clone(),
            window_end_utc: plan.window_utc.end.clone(),
            payload: json!({
                "url": &output["url"],
                "cache_ref": &output["cache_ref"],
                "content_type": &output["content_type"],
            }),
            provenance: json!({
                "plan_id": &plan.plan_id,
                "step_id": &output["step_id"],
                "acquisition_method": &output["method"],
            }),
            data_grade: None,
        });
        perf_ledger.record(&json!({
            "ts": &run_ctx.now_utc,
            "event": "plan_step",
            "source_id": &plan.source_id,
            "plan_id": &plan.plan_id,
            "step_id": &output["step_id"],
            "url": &output["url"],
            "bytes": &output["cache_ref"]["bytes"],
            "method": &output["method"],
        }))?;
    }

    perf_ledger.record(&json!({
        "ts": &run_ctx.now_utc,
        "event": "parallel_stage",
        "stage": Stage::Fetch,
        "workers_used": stage_run.workers_used,
        "max_inflight_bytes": stage_run.max_inflight_bytes,
        "wall_ms": stage_run.wall_ms,
    }))?;

    Ok(ExecutionResult {
        packets,
        cache_refs,
    })
}
