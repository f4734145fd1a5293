// crates/abraxas-validate/src/seal.rs
// ============================================================================
// Module: Seal Report
// Description: Release verdict combining validation and the dozen-run gate.
// Purpose: One deterministic artifact deciding whether a build seals.
// Dependencies: abraxas-core, abraxas-runtime, serde_json, crate::validator
// ============================================================================

//! ## Overview
//! Sealing a release runs one deterministic tick, validates the emitted
//! artifacts, runs the dozen-run gate, and writes `SealReport.v0` with the
//! rolled-up verdict: `ok` holds only when validation and the gate both
//! pass. The report embeds the gate summary rather than its full divergence
//! payload; the stability record carries the details.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use abraxas_core::canonical_json_bytes;
use abraxas_core::sha256_hex;
use abraxas_runtime::Divergence;
use abraxas_runtime::DozenRunGateResult;
use abraxas_runtime::RuntimeError;
use serde_json::Value;
use serde_json::json;

use crate::validator::ValidationResult;

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Inputs rolled into one seal report.
pub struct SealInputs<'a> {
    /// Release version label.
    pub version: &'a str,
    /// Version pack document.
    pub version_pack: Value,
    /// Artifact paths and hashes of the seal tick.
    pub seal_tick_artifacts: Value,
    /// Validation outcome over the seal tick.
    pub validation_result: &'a ValidationResult,
    /// Dozen-run gate outcome.
    pub dozen_gate_result: &'a DozenRunGateResult,
}

/// Returns the label of a divergence, when any.
fn divergence_kind(divergence: Option<&Divergence>) -> Option<&'static str> {
    divergence.map(|divergence| match divergence {
        Divergence::TrendpackContentMismatch {
            ..
        } => "trendpack_content_mismatch",
        Divergence::RunheaderSha256Mismatch {
            ..
        } => "runheader_sha256_mismatch",
    })
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Writes the `SealReport.v0` for a run.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the report cannot be encoded or written.
pub fn write_seal_report(
    artifacts_dir: &Path,
    run_id: &str,
    inputs: &SealInputs<'_>,
) -> Result<(PathBuf, String), RuntimeError> {
    let ok = inputs.validation_result.ok && inputs.dozen_gate_result.ok;

    let report = json!({
        "schema": "SealReport.v0",
        "version": inputs.version,
        "version_pack": &inputs.version_pack,
        "seal_tick_artifacts": &inputs.seal_tick_artifacts,
        "validation_result": {
            "ok": inputs.validation_result.ok,
            "validated_ticks": &inputs.validation_result.validated_ticks,
            "failures": &inputs.validation_result.failures,
        },
        "dozen_gate_result": {
            "ok": inputs.dozen_gate_result.ok,
            "expected_trendpack_sha256": &inputs.dozen_gate_result.expected_trendpack_sha256,
            "expected_runheader_sha256": &inputs.dozen_gate_result.expected_runheader_sha256,
            "first_mismatch_run": inputs.dozen_gate_result.first_mismatch_run,
            "divergence_kind": divergence_kind(inputs.dozen_gate_result.divergence.as_ref()),
        },
        "ok": ok,
    });

    let out = artifacts_dir.join("runs").join(format!("{run_id}.sealreport.json"));
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|source| RuntimeError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let bytes = canonical_json_bytes(&report)?;
    fs::write(&out, &bytes).map_err(|source| RuntimeError::Io {
        path: out.clone(),
        source,
    })?;
    Ok((out, sha256_hex(&bytes)))
}
