// crates/abraxas-runtime/src/gate.rs
// ============================================================================
// Module: Dozen-Run Invariance Gate
// Description: N-run identical-hash assertion over emitted artifacts.
// Purpose: Certify artifact-level determinism with typed divergence.
// Dependencies: serde, serde_json, crate::{error, tick}, tracing
// ============================================================================

//! ## Overview
//! The gate runs the same tick N times (twelve by default) into isolated
//! artifact directories under `dozen_gate/run_<i>` and passes only when the
//! TrendPack hashes and the RunHeader hashes each collapse to a single
//! unique value. On failure it reads the baseline and the mismatching
//! artifact and reports a typed divergence (the first differing event for
//! TrendPack content, or the field-level header diff), which is the unit a
//! maintainer debugs a drift bug at.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::error::RuntimeError;
use crate::error::io_err;
use crate::error::json_err;
use crate::tick::TickOutcome;

// ============================================================================
// SECTION: Divergence
// ============================================================================

/// Typed divergence reported by a failed gate.
///
/// # Invariants
/// - Variants are stable for serialization and artifact matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Divergence {
    /// TrendPack content differed between runs.
    TrendpackContentMismatch {
        /// Index of the first differing timeline event, when locatable.
        event_index: Option<u64>,
        /// Baseline TrendPack path.
        baseline_trendpack: String,
        /// Mismatching TrendPack path.
        mismatch_trendpack: String,
        /// First differing event pair `{a, b}`, when locatable.
        diff: Option<Value>,
    },
    /// RunHeader hashes differed between runs.
    RunheaderSha256Mismatch {
        /// Baseline RunHeader path.
        baseline_runheader: String,
        /// Mismatching RunHeader path.
        mismatch_runheader: String,
        /// Field-level diffs keyed by header field.
        diffs: Value,
    },
}

/// Outcome of a dozen-run gate.
///
/// # Invariants
/// - `ok` holds exactly when both hash arrays contain one unique value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DozenRunGateResult {
    /// Whether every run hashed identically.
    pub ok: bool,
    /// Baseline TrendPack hash.
    pub expected_trendpack_sha256: Option<String>,
    /// TrendPack hash per run, in run order.
    pub trendpack_sha256s: Vec<String>,
    /// Baseline RunHeader hash.
    pub expected_runheader_sha256: Option<String>,
    /// RunHeader hash per run, in run order.
    pub runheader_sha256s: Vec<String>,
    /// Index of the first mismatching run, when any.
    pub first_mismatch_run: Option<u64>,
    /// Typed divergence payload, when any.
    pub divergence: Option<Divergence>,
}

// ============================================================================
// SECTION: Diff Helpers
// ============================================================================

/// Reads and parses a JSON artifact.
fn read_json(path: &Path) -> Result<Value, RuntimeError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&text).map_err(|e| json_err(path, e))
}

/// Finds the first differing event between two timelines.
fn first_event_divergence(a: &[Value], b: &[Value]) -> Option<(u64, Value)> {
    let shared = a.len().min(b.len());
    for i in 0 .. shared {
        if a[i] != b[i] {
            return Some((i as u64, json!({ "a": &a[i], "b": &b[i] })));
        }
    }
    if a.len() == b.len() {
        return None;
    }
    Some((shared as u64, json!({ "a": { "_len": a.len() }, "b": { "_len": b.len() } })))
}

/// Computes field-level diffs between two JSON objects.
fn object_field_diffs(a: &Value, b: &Value) -> Value {
    let mut diffs = serde_json::Map::new();
    let empty = serde_json::Map::new();
    let a_map = a.as_object().unwrap_or(&empty);
    let b_map = b.as_object().unwrap_or(&empty);
    let keys: std::collections::BTreeSet<&String> = a_map.keys().chain(b_map.keys()).collect();
    for key in keys {
        let left = a_map.get(key.as_str()).cloned().unwrap_or(Value::Null);
        let right = b_map.get(key.as_str()).cloned().unwrap_or(Value::Null);
        if left != right {
            diffs.insert(key.clone(), json!({ "a": left, "b": right }));
        }
    }
    Value::Object(diffs)
}

// ============================================================================
// SECTION: Gate Execution
// ============================================================================

/// Runs one deterministic tick N times in isolated artifact directories and
/// asserts identical TrendPack and RunHeader hashes.
///
/// `run_once(i, artifacts_dir)` must execute the tick into the given
/// directory and return the standard tick outcome.
///
/// # Errors
///
/// Returns [`RuntimeError`] when a run fails outright or a divergence
/// artifact cannot be read back for diffing. A hash mismatch is not an
/// error; it is reported in the result.
pub fn dozen_run_tick_invariance_gate<F>(
    base_artifacts_dir: &Path,
    runs: u64,
    mut run_once: F,
) -> Result<DozenRunGateResult, RuntimeError>
where
    F: FnMut(u64, &Path) -> Result<TickOutcome, RuntimeError>,
{
    let base = base_artifacts_dir.join("dozen_gate");
    fs::create_dir_all(&base).map_err(|e| io_err(&base, e))?;

    let mut trendpack_paths: Vec<PathBuf> = Vec::new();
    let mut trendpack_sha256s: Vec<String> = Vec::new();
    let mut runheader_paths: Vec<PathBuf> = Vec::new();
    let mut runheader_sha256s: Vec<String> = Vec::new();

    for i in 0 .. runs {
        let run_dir = base.join(format!("run_{i:02}"));
        let outcome = run_once(i, &run_dir)?;
        if outcome.artifacts.trendpack.is_empty() || outcome.artifacts.trendpack_sha256.is_empty()
        {
            return Err(RuntimeError::GateContract {
                reason: "run_once must return a trendpack path and hash".to_string(),
            });
        }
        trendpack_paths.push(run_dir.join(&outcome.artifacts.trendpack));
        trendpack_sha256s.push(outcome.artifacts.trendpack_sha256.clone());
        runheader_paths.push(run_dir.join(&outcome.artifacts.run_header));
        runheader_sha256s.push(outcome.artifacts.run_header_sha256.clone());
    }

    let expected_trendpack = trendpack_sha256s.first().cloned();
    let expected_runheader = runheader_sha256s.first().cloned();

    for (i, sha) in trendpack_sha256s.iter().enumerate() {
        if Some(sha) != expected_trendpack.as_ref() {
            let baseline = read_json(&trendpack_paths[0])?;
            let mismatch = read_json(&trendpack_paths[i])?;
            let empty = Vec::new();
            let a = baseline.get("timeline").and_then(Value::as_array).unwrap_or(&empty);
            let b = mismatch.get("timeline").and_then(Value::as_array).unwrap_or(&empty);
            let located = first_event_divergence(a, b);
            tracing::warn!(run = i, "trendpack divergence detected");
            return Ok(DozenRunGateResult {
                ok: false,
                expected_trendpack_sha256: expected_trendpack,
                trendpack_sha256s: trendpack_sha256s.clone(),
                expected_runheader_sha256: expected_runheader,
                runheader_sha256s,
                first_mismatch_run: Some(i as u64),
                divergence: Some(Divergence::TrendpackContentMismatch {
                    event_index: located.as_ref().map(|(index, _)| *index),
                    baseline_trendpack: trendpack_paths[0].to_string_lossy().into_owned(),
                    mismatch_trendpack: trendpack_paths[i].to_string_lossy().into_owned(),
                    diff: located.map(|(_, diff)| diff),
                }),
            });
        }
    }

    for (i, sha) in runheader_sha256s.iter().enumerate() {
        if Some(sha) != expected_runheader.as_ref() {
            let baseline = read_json(&runheader_paths[0])?;
            let mismatch = read_json(&runheader_paths[i])?;
            tracing::warn!(run = i, "runheader divergence detected");
            return Ok(DozenRunGateResult {
                ok: false,
                expected_trendpack_sha256: expected_trendpack,
                trendpack_sha256s,
                expected_runheader_sha256: expected_runheader,
                runheader_sha256s: runheader_sha256s.clone(),
                first_mismatch_run: Some(i as u64),
                divergence: Some(Divergence::RunheaderSha256Mismatch {
                    baseline_runheader: runheader_paths[0].to_string_lossy().into_owned(),
                    mismatch_runheader: runheader_paths[i].to_string_lossy().into_owned(),
                    diffs: object_field_diffs(&baseline, &mismatch),
                }),
            });
        }
    }

    Ok(DozenRunGateResult {
        ok: true,
        expected_trendpack_sha256: expected_trendpack,
        trendpack_sha256s,
        expected_runheader_sha256: expected_runheader,
        runheader_sha256s,
        first_mismatch_run: None,
        divergence: None,
    })
}
