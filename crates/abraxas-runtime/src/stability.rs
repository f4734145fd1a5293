// crates/abraxas-runtime/src/stability.rs
// ============================================================================
// Module: Run Stability
// Description: Persisted gate verdicts and their discovery pointers.
// Purpose: Let readers check determinism without re-running the gate.
// Dependencies: abraxas-core, serde, serde_json, crate::{error, gate,
// run_header}
// ============================================================================

//! ## Overview
//! The RunHeader is write-once, so gate verdicts live next to it instead of
//! inside it: `runs/<run_id>.runstability.json` holds the latest
//! `RunStability.v0` and `runs/<run_id>.stability_ref.json` is a small
//! pointer whose existence lets readers skip re-running the gate. The
//! reader resolves the pointer first and falls back to the direct path;
//! malformed records resolve to nothing rather than failing a UI.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use abraxas_core::canonical_json_bytes;
use abraxas_core::sha256_hex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::RuntimeError;
use crate::error::io_err;
use crate::gate::Divergence;
use crate::gate::DozenRunGateResult;
use crate::run_header::VerifyOutcome;
use crate::run_header::verify_file_sha256;

// ============================================================================
// SECTION: Artifact Shapes
// ============================================================================

/// Persisted per-run gate verdict.
///
/// # Invariants
/// - Overwrites are allowed; this is the latest known stability record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStability {
    /// Schema tag, always `RunStability.v0`.
    pub schema: String,
    /// Run the verdict covers.
    pub run_id: String,
    /// Whether the gate passed.
    pub ok: bool,
    /// Baseline TrendPack hash.
    pub expected_trendpack_sha256: Option<String>,
    /// TrendPack hash per run.
    pub trendpack_sha256s: Vec<String>,
    /// Baseline RunHeader hash.
    pub expected_runheader_sha256: Option<String>,
    /// RunHeader hash per run.
    pub runheader_sha256s: Vec<String>,
    /// Index of the first mismatching run, when any.
    pub first_mismatch_run: Option<u64>,
    /// Typed divergence payload, when any.
    pub divergence: Option<Divergence>,
    /// Optional operator note.
    pub note: Option<String>,
}

/// Small pointer from the header convention path to the stability record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityRef {
    /// Schema tag, always `StabilityRef.v0`.
    pub schema: String,
    /// Run the pointer covers.
    pub run_id: String,
    /// Artifacts-dir-relative path of the stability record.
    pub runstability_path: String,
    /// Content hash of the stability record.
    pub runstability_sha256: String,
}

/// Compact stability summary for ViewPack badge embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilitySummary {
    /// Schema tag, always `StabilitySummary.v0`.
    pub schema: String,
    /// Whether the gate passed.
    pub ok: bool,
    /// Index of the first mismatching run, when any.
    pub first_mismatch_run: Option<u64>,
    /// Divergence kind label, when any.
    pub divergence_kind: Option<String>,
}

// ============================================================================
// SECTION: Writers
// ============================================================================

/// Writes the `RunStability.v0` record for a run.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the record cannot be encoded or written.
pub fn write_run_stability(
    artifacts_dir: &Path,
    run_id: &str,
    gate_result: &DozenRunGateResult,
    note: Option<&str>,
) -> Result<(PathBuf, String), RuntimeError> {
    let out = artifacts_dir.join("runs").join(format!("{run_id}.runstability.json"));
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let record = RunStability {
        schema: "RunStability.v0".to_string(),
        run_id: run_id.to_string(),
        ok: gate_result.ok,
        expected_trendpack_sha256: gate_result.expected_trendpack_sha256.clone(),
        trendpack_sha256s: gate_result.trendpack_sha256s.clone(),
        expected_runheader_sha256: gate_result.expected_runheader_sha256.clone(),
        runheader_sha256s: gate_result.runheader_sha256s.clone(),
        first_mismatch_run: gate_result.first_mismatch_run,
        divergence: gate_result.divergence.clone(),
        note: note.map(ToString::to_string),
    };

    let bytes = canonical_json_bytes(&record)?;
    fs::write(&out, &bytes).map_err(|e| io_err(&out, e))?;
    Ok((out, sha256_hex(&bytes)))
}

/// Writes the `StabilityRef.v0` pointer for a run.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the pointer cannot be encoded or written.
pub fn write_stability_ref(
    artifacts_dir: &Path,
    run_id: &str,
    runstability_sha256: &str,
) -> Result<(PathBuf, String), RuntimeError> {
    let out = artifacts_dir.join("runs").join(format!("{run_id}.stability_ref.json"));
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let pointer = StabilityRef {
        schema: "StabilityRef.v0".to_string(),
        run_id: run_id.to_string(),
        runstability_path: format!("runs/{run_id}.runstability.json"),
        runstability_sha256: runstability_sha256.to_string(),
    };

    let bytes = canonical_json_bytes(&pointer)?;
    fs::write(&out, &bytes).map_err(|e| io_err(&out, e))?;
    Ok((out, sha256_hex(&bytes)))
}

// ============================================================================
// SECTION: Readers
// ============================================================================

/// Parses a JSON file into a typed value, returning `None` on any failure.
fn read_typed<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Reads the stability record for a run, pointer first, then direct path.
///
/// Malformed or missing records yield `None`; this reader never fails a UI.
#[must_use]
pub fn read_run_stability(artifacts_dir: &Path, run_id: &str) -> Option<RunStability> {
    let ref_path = artifacts_dir.join("runs").join(format!("{run_id}.stability_ref.json"));
    if let Some(pointer) = read_typed::<StabilityRef>(&ref_path)
        && pointer.schema == "StabilityRef.v0"
    {
        let target = artifacts_dir.join(&pointer.runstability_path);
        if let Some(record) = read_typed::<RunStability>(&target)
            && record.schema == "RunStability.v0"
        {
            return Some(record);
        }
    }

    let direct = artifacts_dir.join("runs").join(format!("{run_id}.runstability.json"));
    read_typed::<RunStability>(&direct).filter(|record| record.schema == "RunStability.v0")
}

/// Reads the compact stability summary for a run.
#[must_use]
pub fn read_stability_summary(artifacts_dir: &Path, run_id: &str) -> Option<StabilitySummary> {
    let record = read_run_stability(artifacts_dir, run_id)?;
    let divergence_kind = record.divergence.as_ref().map(|divergence| match divergence {
        Divergence::TrendpackContentMismatch {
            ..
        } => "trendpack_content_mismatch".to_string(),
        Divergence::RunheaderSha256Mismatch {
            ..
        } => "runheader_sha256_mismatch".to_string(),
    });
    Some(StabilitySummary {
        schema: "StabilitySummary.v0".to_string(),
        ok: record.ok,
        first_mismatch_run: record.first_mismatch_run,
        divergence_kind,
    })
}

/// Loads a `RunStability.v0`, checking its schema tag.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the record is missing or malformed.
pub fn load_run_stability(path: &Path) -> Result<RunStability, RuntimeError> {
    if !path.exists() {
        return Err(RuntimeError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let record: RunStability =
        serde_json::from_str(&text).map_err(|e| crate::error::json_err(path, e))?;
    if record.schema != "RunStability.v0" {
        return Err(RuntimeError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: "RunStability.v0".to_string(),
            found: record.schema,
        });
    }
    Ok(record)
}

/// Verifies a stability record against its expected hash.
#[must_use]
pub fn verify_run_stability(path: &Path, expected_sha256: &str) -> VerifyOutcome {
    verify_file_sha256(path, expected_sha256, "RunStability")
}

/// Returns whether a stability record exists for a run.
#[must_use]
pub fn stability_exists(artifacts_dir: &Path, run_id: &str) -> bool {
    read_run_stability(artifacts_dir, run_id).is_some()
}

/// Serializes a gate result for ledgers or CLI output.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the result has no canonical encoding.
pub fn gate_result_value(gate_result: &DozenRunGateResult) -> Result<Value, RuntimeError> {
    Ok(serde_json::to_value(gate_result).map_err(abraxas_core::CanonicalError::Encode)?)
}
