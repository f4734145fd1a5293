// crates/abraxas-validate/src/validator.rs
// ============================================================================
// Module: Artifact Validation
// Description: Tick- and run-level validation with reference cross-checks.
// Purpose: Catch structural drift in the emitted artifact graph.
// Dependencies: jsonschema, serde, serde_json, crate::schemas
// ============================================================================

//! ## Overview
//! Validation never aborts on the first failure: every violation becomes a
//! `ValidationFailure` with its artifact kind, path, and error messages. An
//! invalid RunIndex short-circuits its tick, because the refs it carries
//! cannot be followed. Reference cross-checks compare filenames only; the
//! directories legitimately differ between isolated artifact trees.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::schemas::ArtifactKind;
use crate::schemas::schema_for;

// ============================================================================
// SECTION: Results
// ============================================================================

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Tick the failure belongs to; run-level artifacts carry none.
    pub tick: Option<u64>,
    /// Artifact kind label.
    pub artifact_kind: String,
    /// Path of the offending artifact.
    pub path: String,
    /// Error messages.
    pub errors: Vec<String>,
}

/// Validation outcome for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickValidation {
    /// Whether the tick passed with zero failures.
    pub ok: bool,
    /// Tick that was validated.
    pub tick: u64,
    /// Failures found.
    pub failures: Vec<ValidationFailure>,
}

/// Validation outcome for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether every validated artifact passed.
    pub ok: bool,
    /// Ticks that were validated, ascending.
    pub validated_ticks: Vec<u64>,
    /// Failures found.
    pub failures: Vec<ValidationFailure>,
}

// ============================================================================
// SECTION: Artifact Validation
// ============================================================================

/// Validates one artifact file against its kind's schema.
///
/// Returns `(ok, errors)`; a missing or unparsable file is a failure, not a
/// panic.
#[must_use]
pub fn validate_artifact(path: &Path, kind: ArtifactKind) -> (bool, Vec<String>) {
    if !path.exists() {
        return (false, vec![format!("file not found: {}", path.display())]);
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) => return (false, vec![format!("unreadable: {error}")]),
    };
    let instance: Value = match serde_json::from_str(&text) {
        Ok(instance) => instance,
        Err(error) => return (false, vec![format!("json parse error: {error}")]),
    };

    let schema = schema_for(kind);
    let validator = match jsonschema::validator_for(&schema) {
        Ok(validator) => validator,
        Err(error) => return (false, vec![format!("schema build failed: {error}")]),
    };
    let errors: Vec<String> =
        validator.iter_errors(&instance).map(|error| error.to_string()).collect();
    (errors.is_empty(), errors)
}

/// Reads a JSON artifact, returning `None` on any failure.
fn read_json(path: &Path) -> Option<Value> {
    let text = fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

/// Returns the filename component of a path string.
fn filename_of(path: &str) -> &str {
    Path::new(path).file_name().and_then(|name| name.to_str()).unwrap_or(path)
}

// ============================================================================
// SECTION: Tick Validation
// ============================================================================

/// Validates one tick's artifact graph from its RunIndex outward.
#[must_use]
pub fn validate_tick(artifacts_dir: &Path, run_id: &str, tick: u64) -> TickValidation {
    let mut failures: Vec<ValidationFailure> = Vec::new();

    let index_path =
        artifacts_dir.join("run_index").join(run_id).join(format!("{tick:06}.runindex.json"));
    let (index_ok, index_errors) = validate_artifact(&index_path, ArtifactKind::RunIndex);
    if !index_ok {
        failures.push(ValidationFailure {
            tick: Some(tick),
            artifact_kind: ArtifactKind::RunIndex.to_string(),
            path: index_path.to_string_lossy().into_owned(),
            errors: index_errors,
        });
        // Without a valid index the refs cannot be followed.
        return TickValidation {
            ok: false,
            tick,
            failures,
        };
    }

    let index = read_json(&index_path).unwrap_or(Value::Null);
    let refs = index.get("refs").cloned().unwrap_or(Value::Null);

    let mut check_ref = |key: &str, kind: ArtifactKind| -> Option<String> {
        let rel = refs.get(key).and_then(Value::as_str)?;
        let path = artifacts_dir.join(rel);
        let (ok, errors) = validate_artifact(&path, kind);
        if !ok {
            failures.push(ValidationFailure {
                tick: Some(tick),
                artifact_kind: kind.to_string(),
                path: path.to_string_lossy().into_owned(),
                errors,
            });
        }
        Some(rel.to_string())
    };

    let trendpack_rel = check_ref("trendpack", ArtifactKind::TrendPack);
    let results_rel = check_ref("results_pack", ArtifactKind::ResultsPack);
    check_ref("run_header", ArtifactKind::RunHeader);

    let view_path =
        artifacts_dir.join("view").join(run_id).join(format!("{tick:06}.viewpack.json"));
    if view_path.exists() {
        let (ok, errors) = validate_artifact(&view_path, ArtifactKind::ViewPack);
        if !ok {
            failures.push(ValidationFailure {
                tick: Some(tick),
                artifact_kind: ArtifactKind::ViewPack.to_string(),
                path: view_path.to_string_lossy().into_owned(),
                errors,
            });
        }
    }

    // Cross-check: every event's result reference must name the tick's
    // ResultsPack file.
    if let (Some(trendpack_rel), Some(results_rel)) = (trendpack_rel, results_rel) {
        let trendpack_path = artifacts_dir.join(&trendpack_rel);
        if let Some(trendpack) = read_json(&trendpack_path) {
            let expected_name = filename_of(&results_rel).to_string();
            let empty = Vec::new();
            let timeline =
                trendpack.get("timeline").and_then(Value::as_array).unwrap_or(&empty);
            for (i, event) in timeline.iter().enumerate() {
                let Some(ref_path) = event
                    .get("meta")
                    .and_then(|meta| meta.get("result_ref"))
                    .and_then(|reference| reference.get("results_pack"))
                    .and_then(Value::as_str)
                else {
                    continue;
                };
                let ref_name = filename_of(ref_path);
                if ref_name != expected_name {
                    failures.push(ValidationFailure {
                        tick: Some(tick),
                        artifact_kind: ArtifactKind::TrendPack.to_string(),
                        path: trendpack_path.to_string_lossy().into_owned(),
                        errors: vec![format!(
                            "timeline[{i}].meta.result_ref.results_pack filename mismatch: \
                             {ref_name} != {expected_name}"
                        )],
                    });
                }
            }
        }
    }

    TickValidation {
        ok: failures.is_empty(),
        tick,
        failures,
    }
}

// ============================================================================
// SECTION: Run Validation
// ============================================================================

/// Discovers the tick numbers of a run from its RunIndex files.
fn discover_ticks(artifacts_dir: &Path, run_id: &str) -> Vec<u64> {
    let dir = artifacts_dir.join("run_index").join(run_id);
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut ticks: Vec<u64> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            let head = name.strip_suffix(".runindex.json")?;
            head.parse().ok()
        })
        .collect();
    ticks.sort_unstable();
    ticks
}

/// Validates a run: one tick or every discovered tick, plus the run-level
/// artifacts when present.
#[must_use]
pub fn validate_run(artifacts_dir: &Path, run_id: &str, tick: Option<u64>) -> ValidationResult {
    let mut failures: Vec<ValidationFailure> = Vec::new();
    let mut validated_ticks: Vec<u64> = Vec::new();

    let ticks = match tick {
        Some(tick) => vec![tick],
        None => {
            let discovered = discover_ticks(artifacts_dir, run_id);
            if discovered.is_empty() {
                let dir = artifacts_dir.join("run_index").join(run_id);
                failures.push(ValidationFailure {
                    tick: None,
                    artifact_kind: ArtifactKind::RunIndex.to_string(),
                    path: dir.to_string_lossy().into_owned(),
                    errors: vec!["directory not found or empty".to_string()],
                });
            }
            discovered
        }
    };

    for tick in ticks {
        let outcome = validate_tick(artifacts_dir, run_id, tick);
        validated_ticks.push(tick);
        failures.extend(outcome.failures);
    }

    // Run-level artifacts are validated when present.
    let run_level = [
        (format!("runs/{run_id}.runheader.json"), ArtifactKind::RunHeader),
        (format!("runs/{run_id}.runstability.json"), ArtifactKind::RunStability),
        (format!("runs/{run_id}.stability_ref.json"), ArtifactKind::StabilityRef),
    ];
    for (rel, kind) in run_level {
        let path = artifacts_dir.join(&rel);
        if !path.exists() {
            continue;
        }
        let (ok, errors) = validate_artifact(&path, kind);
        if !ok {
            failures.push(ValidationFailure {
                tick: None,
                artifact_kind: kind.to_string(),
                path: path.to_string_lossy().into_owned(),
                errors,
            });
        }
    }

    validated_ticks.sort_unstable();
    ValidationResult {
        ok: failures.is_empty(),
        validated_ticks,
        failures,
    }
}
