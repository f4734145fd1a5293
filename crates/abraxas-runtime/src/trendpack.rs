// crates/abraxas-runtime/src/trendpack.rs
// ============================================================================
// Module: TrendPack
// Description: Per-tick execution timeline artifact built from the trace.
// Purpose: Queryable, denormalized view of what ran, at what cost.
// Dependencies: abraxas-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The TrendPack summarizes one tick's trace: the ordered timeline, per-lane
//! budget spend (excluding budget skips), error and skip extracts, and count
//! statistics. It deliberately omits task outputs; events point into the
//! ResultsPack through `meta.result_ref` instead of embedding payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use abraxas_core::Lane;
use abraxas_core::TaskStatus;
use abraxas_core::TraceEvent;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Artifact Shapes
// ============================================================================

/// One timeline event of a TrendPack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Task name.
    pub task: String,
    /// Execution lane.
    pub lane: Lane,
    /// Outcome status.
    pub status: TaskStatus,
    /// Declared ops cost.
    pub cost_ops: i64,
    /// Declared entropy cost.
    pub cost_entropy: i64,
    /// Event metadata, including the result reference.
    pub meta: Map<String, Value>,
}

/// Budget spend of one lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneSpend {
    /// Ops deducted in the lane.
    pub spent_ops: i64,
    /// Entropy deducted in the lane.
    pub spent_entropy: i64,
}

/// Per-lane budget spend, budget skips excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSpend {
    /// Forecast-lane spend.
    pub forecast: LaneSpend,
    /// Shadow-lane spend.
    pub shadow: LaneSpend,
}

/// Error extract of a TrendPack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendError {
    /// Task name.
    pub task: String,
    /// Execution lane.
    pub lane: Lane,
    /// Declared ops cost.
    pub cost_ops: i64,
    /// Event metadata.
    pub meta: Map<String, Value>,
}

/// Budget-skip extract of a TrendPack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSkipped {
    /// Task name.
    pub task: String,
    /// Execution lane.
    pub lane: Lane,
    /// Declared ops cost.
    pub cost_ops: i64,
    /// Declared entropy cost.
    pub cost_entropy: i64,
}

/// Count statistics of a TrendPack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendStats {
    /// Total event count.
    pub total_events: u64,
    /// Forecast-lane event count.
    pub forecast_events: u64,
    /// Shadow-lane event count.
    pub shadow_events: u64,
    /// Error event count.
    pub errors: u64,
    /// Budget-skip event count.
    pub skipped: u64,
    /// Ok event count.
    pub ok_events: u64,
}

/// Per-tick execution timeline artifact.
///
/// # Invariants
/// - `timeline` preserves trace (execution) order.
/// - `budget` sums declared costs of events with status other than
///   `skipped_budget`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPack {
    /// Schema version tag, always `TrendPack.v0`.
    pub version: String,
    /// Run the tick belongs to.
    pub run_id: String,
    /// Tick number.
    pub tick: u64,
    /// Provenance envelope, including the policy reference.
    pub provenance: Value,
    /// Ordered timeline events.
    pub timeline: Vec<TimelineEvent>,
    /// Per-lane budget spend.
    pub budget: BudgetSpend,
    /// Error extracts.
    pub errors: Vec<TrendError>,
    /// Budget-skip extracts.
    pub skipped: Vec<TrendSkipped>,
    /// Count statistics.
    pub stats: TrendStats,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds a TrendPack from a scheduler trace.
#[must_use]
pub fn build_trendpack(
    trace: &[TraceEvent],
    run_id: &str,
    tick: u64,
    provenance: Value,
) -> TrendPack {
    let timeline: Vec<TimelineEvent> = trace
        .iter()
        .map(|event| TimelineEvent {
            task: event.task.clone(),
            lane: event.lane,
            status: event.status,
            cost_ops: event.cost_ops,
            cost_entropy: event.cost_entropy,
            meta: event.meta.clone(),
        })
        .collect();

    let mut budget = BudgetSpend::default();
    for event in trace {
        if event.status == TaskStatus::SkippedBudget {
            continue;
        }
        let lane_spend = match event.lane {
            Lane::Forecast => &mut budget.forecast,
            Lane::Shadow => &mut budget.shadow,
        };
        lane_spend.spent_ops += event.cost_ops;
        lane_spend.spent_entropy += event.cost_entropy;
    }

    let errors: Vec<TrendError> = trace
        .iter()
        .filter(|event| event.status == TaskStatus::Error)
        .map(|event| TrendError {
            task: event.task.clone(),
            lane: event.lane,
            cost_ops: event.cost_ops,
            meta: event.meta.clone(),
        })
        .collect();

    let skipped: Vec<TrendSkipped> = trace
        .iter()
        .filter(|event| event.status == TaskStatus::SkippedBudget)
        .map(|event| TrendSkipped {
            task: event.task.clone(),
            lane: event.lane,
            cost_ops: event.cost_ops,
            cost_entropy: event.cost_entropy,
        })
        .collect();

    let stats = TrendStats {
        total_events: trace.len() as u64,
        forecast_events: trace.iter().filter(|e| e.lane == Lane::Forecast).count() as u64,
        shadow_events: trace.iter().filter(|e| e.lane == Lane::Shadow).count() as u64,
        errors: errors.len() as u64,
        skipped: skipped.len() as u64,
        ok_events: trace.iter().filter(|e| e.status == TaskStatus::Ok).count() as u64,
    };

    TrendPack {
        version: "TrendPack.v0".to_string(),
        run_id: run_id.to_string(),
        tick,
        provenance,
        timeline,
        budget,
        errors,
        skipped,
        stats,
    }
}
