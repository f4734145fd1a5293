// crates/abraxas-core/src/invariance.rs
// ============================================================================
// Module: Trace Invariance Check
// Description: N-run identical-hash assertion over scheduler traces.
// Purpose: Certify trace-level determinism and report the first divergence.
// Dependencies: crate::trace, crate::scheduler, serde_json
// ============================================================================

//! ## Overview
//! The trace-level gate runs a trace producer N times and passes only when
//! every run hashes identically. On failure it reports the first differing
//! event between the baseline run and the mismatching run, which is the
//! practical unit a maintainer debugs a drift bug at. The artifact-level
//! gate in `abraxas-runtime` builds on the same discipline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::hashing::CanonicalError;
use crate::scheduler::TraceEvent;
use crate::trace::canonicalize_trace;
use crate::trace::trace_hash_sha256;

// ============================================================================
// SECTION: Gate Result
// ============================================================================

/// Outcome of a trace-level invariance gate.
///
/// # Invariants
/// - `ok` holds exactly when `hashes` contains a single unique value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvarianceResult {
    /// Whether all runs hashed identically.
    pub ok: bool,
    /// Hash of the baseline run.
    pub expected_hash: String,
    /// Hash of every run, in run order.
    pub hashes: Vec<String>,
    /// Index of the first mismatching run, when any.
    pub first_mismatch_index: Option<usize>,
    /// First-event-level divergence payload, when any.
    pub divergence: Option<Value>,
}

/// Finds the first differing event between two canonical event lists.
fn first_divergence(a: &[Value], b: &[Value]) -> Option<(usize, Value)> {
    let shared = a.len().min(b.len());
    for i in 0 .. shared {
        if a[i] != b[i] {
            return Some((i, json!({ "a": &a[i], "b": &b[i] })));
        }
    }
    if a.len() == b.len() {
        return None;
    }
    Some((shared, json!({ "a": { "_len": a.len() }, "b": { "_len": b.len() } })))
}

/// Extracts the canonical event list from a trace payload.
fn payload_events(payload: &Value) -> Vec<Value> {
    payload
        .get("events")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

// ============================================================================
// SECTION: Gate Execution
// ============================================================================

/// Runs `make_trace` N times and asserts identical canonical hashes.
///
/// The producer must be deterministic given identical ambient state; the run
/// index is provided for directory scoping only and must not influence the
/// trace content.
///
/// # Errors
///
/// Returns [`CanonicalError`] when a produced trace has no canonical
/// encoding.
pub fn run_trace_invariance_gate<F>(
    mut make_trace: F,
    runs: usize,
) -> Result<InvarianceResult, CanonicalError>
where
    F: FnMut(usize) -> Vec<TraceEvent>,
{
    let mut hashes: Vec<String> = Vec::with_capacity(runs);
    let mut payloads: Vec<Value> = Vec::with_capacity(runs);

    for i in 0 .. runs {
        let trace = make_trace(i);
        hashes.push(trace_hash_sha256(&trace)?);
        payloads.push(canonicalize_trace(&trace)?);
    }

    let expected = hashes.first().cloned().unwrap_or_default();
    for (index, hash) in hashes.iter().enumerate() {
        if *hash != expected {
            let base_events = payload_events(&payloads[0]);
            let cur_events = payload_events(&payloads[index]);
            let divergence = first_divergence(&base_events, &cur_events).map(|(event_index, diff)| {
                json!({ "event_index": event_index, "diff": diff })
            });
            return Ok(InvarianceResult {
                ok: false,
                expected_hash: expected,
                hashes: hashes.clone(),
                first_mismatch_index: Some(index),
                divergence,
            });
        }
    }

    Ok(InvarianceResult {
        ok: true,
        expected_hash: expected,
        hashes,
        first_mismatch_index: None,
        divergence: None,
    })
}
