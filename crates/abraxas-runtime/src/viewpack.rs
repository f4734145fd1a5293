// crates/abraxas-runtime/src/viewpack.rs
// ============================================================================
// Module: ViewPack
// Description: Compact per-tick overview artifact for UIs.
// Purpose: One self-contained file per tick; no reference chasing needed.
// Dependencies: abraxas-core, serde, serde_json, crate::{resolve, stability}
// ============================================================================

//! ## Overview
//! The ViewPack embeds the TrendPack aggregates, the event list, and a
//! capped set of resolved results (by default only errors and budget
//! skips). Result references are stripped from both the events and the
//! resolved entries: the pack is self-contained, and reference paths must
//! not leak into content that invariance checks hash. The TrendPack is
//! referenced by a relative path pattern instead.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use abraxas_core::TaskStatus;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::error::RuntimeError;
use crate::resolve::ResolvedEvent;
use crate::resolve::Resolver;
use crate::resolve::load_trendpack;
use crate::stability::StabilitySummary;

// ============================================================================
// SECTION: Summaries
// ============================================================================

/// Per-tick invariance summary for the UI badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvarianceSummary {
    /// Schema tag, always `InvarianceSummary.v0`.
    pub schema: String,
    /// Expected TrendPack hash from the gate.
    pub trendpack_sha256: String,
    /// Expected RunHeader hash from the gate.
    pub runheader_sha256: String,
    /// Whether the gate passed.
    pub passed: bool,
}

// ============================================================================
// SECTION: Artifact Shape
// ============================================================================

/// Compact per-tick overview artifact.
///
/// # Invariants
/// - `events` and `resolved` carry no result reference paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewPack {
    /// Schema tag, always `ViewPack.v0`.
    pub schema: String,
    /// Run the tick belongs to.
    pub run_id: String,
    /// Tick number.
    pub tick: u64,
    /// Execution mode label.
    pub mode: String,
    /// Relative pattern locating the TrendPack.
    pub trendpack_ref: Value,
    /// Stats, budget spend, counts, and optional badges.
    pub aggregates: Value,
    /// Timeline events with result references stripped.
    pub events: Vec<Value>,
    /// Capped resolved results with pack paths stripped.
    pub resolved: Vec<Value>,
    /// Record of the applied resolution filter.
    pub resolved_filter: Value,
    /// Provenance envelope, including the policy reference.
    pub provenance: Value,
}

/// Parameters for building a ViewPack.
pub struct ViewPackParams<'a> {
    /// Run the tick belongs to.
    pub run_id: &'a str,
    /// Tick number.
    pub tick: u64,
    /// Execution mode label.
    pub mode: &'a str,
    /// Cap on the number of resolved entries.
    pub resolve_limit: usize,
    /// Statuses to resolve; `None` resolves every event up to the cap.
    pub resolve_only_status: Option<Vec<TaskStatus>>,
    /// Optional invariance badge.
    pub invariance: Option<InvarianceSummary>,
    /// Optional run-level stability badge.
    pub stability_summary: Option<StabilitySummary>,
    /// Provenance envelope.
    pub provenance: Value,
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Removes `meta.result_ref` from a timeline event.
fn strip_event_ref(event: &Value) -> Value {
    let mut event = event.clone();
    if let Some(meta) = event.get_mut("meta").and_then(Value::as_object_mut) {
        meta.remove("result_ref");
    }
    event
}

/// Serializes a resolved entry with the pack path removed from its ref.
fn strip_resolved_paths(entry: &ResolvedEvent) -> Value {
    let reference = entry.result_ref.as_ref().map(|reference| {
        let mut reference = reference.clone();
        if let Some(map) = reference.as_object_mut() {
            map.remove("results_pack");
        }
        reference
    });
    json!({
        "event": &entry.event,
        "ref": reference,
        "result": &entry.result,
    })
}

/// Builds a `ViewPack.v0` from an emitted TrendPack.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the TrendPack cannot be loaded.
pub fn build_view_pack(
    artifacts_dir: &Path,
    trendpack_rel_path: &str,
    params: &ViewPackParams<'_>,
) -> Result<ViewPack, RuntimeError> {
    let trendpack = load_trendpack(&artifacts_dir.join(trendpack_rel_path))?;

    let empty = Vec::new();
    let timeline = trendpack.get("timeline").and_then(Value::as_array).unwrap_or(&empty);
    let events: Vec<Value> = timeline.iter().map(strip_event_ref).collect();

    let mut resolver = Resolver::new(artifacts_dir);
    let mut resolved =
        resolver.resolve_trendpack_events(trendpack_rel_path, Some(params.resolve_limit))?;
    if let Some(allowed) = &params.resolve_only_status {
        let allowed: Vec<Value> = allowed
            .iter()
            .filter_map(|status| serde_json::to_value(status).ok())
            .collect();
        resolved.retain(|entry| {
            entry
                .event
                .get("status")
                .is_some_and(|status| allowed.contains(status))
        });
    }
    let resolved: Vec<Value> = resolved.iter().map(strip_resolved_paths).collect();

    let mut aggregates = json!({
        "stats": trendpack.get("stats").cloned().unwrap_or_else(|| json!({})),
        "budget": trendpack.get("budget").cloned().unwrap_or_else(|| json!({})),
        "error_count": trendpack.get("errors").and_then(Value::as_array).map_or(0, Vec::len),
        "skipped_count": trendpack.get("skipped").and_then(Value::as_array).map_or(0, Vec::len),
    });
    if let Some(map) = aggregates.as_object_mut() {
        if let Some(invariance) = &params.invariance {
            map.insert(
                "invariance".to_string(),
                serde_json::to_value(invariance)
                    .map_err(abraxas_core::CanonicalError::Encode)?,
            );
        }
        if let Some(stability) = &params.stability_summary {
            map.insert(
                "stability_summary".to_string(),
                serde_json::to_value(stability)
                    .map_err(abraxas_core::CanonicalError::Encode)?,
            );
        }
    }

    let status_filter = params
        .resolve_only_status
        .as_ref()
        .map(|statuses| serde_json::to_value(statuses).unwrap_or(Value::Null));

    Ok(ViewPack {
        schema: "ViewPack.v0".to_string(),
        run_id: params.run_id.to_string(),
        tick: params.tick,
        mode: params.mode.to_string(),
        trendpack_ref: json!({
            "pattern": "viz/{run_id}/{tick:06}.trendpack.json",
            "run_id": params.run_id,
            "tick": params.tick,
        }),
        aggregates,
        events,
        resolved_filter: json!({
            "limit": params.resolve_limit,
            "status_filter": status_filter,
            "actual_count": resolved.len(),
        }),
        resolved,
        provenance: params.provenance.clone(),
    })
}
