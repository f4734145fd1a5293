// crates/abraxas-runtime/src/results.rs
// ============================================================================
// Module: ResultsPack and ResultRef
// Description: Per-tick task output artifact and lightweight pointers to it.
// Purpose: Keep TrendPacks light while task outputs stay resolvable.
// Dependencies: abraxas-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The ResultsPack carries every task result of a tick, sorted by task name.
//! TrendPack events point here via `ResultRef.v0` (an artifacts-dir-relative
//! pack path plus a task name) instead of embedding bulky payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use abraxas_core::TaskResult;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Artifact Shapes
// ============================================================================

/// One task entry of a ResultsPack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsItem {
    /// Task name.
    pub task: String,
    /// Full task result.
    pub result: TaskResult,
}

/// Per-tick task output artifact.
///
/// # Invariants
/// - `items` is sorted by task name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsPack {
    /// Schema tag, always `ResultsPack.v0`.
    pub schema: String,
    /// Run the tick belongs to.
    pub run_id: String,
    /// Tick number.
    pub tick: u64,
    /// Task entries in task-name order.
    pub items: Vec<ResultsItem>,
    /// Provenance envelope, including the policy reference.
    pub provenance: Value,
}

/// Lightweight pointer from a TrendPack event into a ResultsPack.
///
/// # Invariants
/// - `results_pack` is artifacts-dir-relative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRef {
    /// Schema tag, always `ResultRef.v0`.
    pub schema: String,
    /// Artifacts-dir-relative ResultsPack path.
    pub results_pack: String,
    /// Task name the pointer resolves to.
    pub task: String,
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a ResultsPack from a tick's result map.
#[must_use]
pub fn build_results_pack(
    run_id: &str,
    tick: u64,
    results: &BTreeMap<String, TaskResult>,
    provenance: Value,
) -> ResultsPack {
    let items: Vec<ResultsItem> = results
        .iter()
        .map(|(task, result)| ResultsItem {
            task: task.clone(),
            result: result.clone(),
        })
        .collect();
    ResultsPack {
        schema: "ResultsPack.v0".to_string(),
        run_id: run_id.to_string(),
        tick,
        items,
        provenance,
    }
}

/// Creates a result pointer for one task of a ResultsPack.
#[must_use]
pub fn make_result_ref(results_pack_rel_path: &str, task: &str) -> ResultRef {
    ResultRef {
        schema: "ResultRef.v0".to_string(),
        results_pack: results_pack_rel_path.to_string(),
        task: task.to_string(),
    }
}
