// crates/abraxas-runtime/src/run_header.rs
// ============================================================================
// Module: RunHeader
// Description: Run-level provenance written once per run identifier.
// Purpose: Keep tick artifacts light; heavy provenance belongs to the run.
// Dependencies: abraxas-core, serde_json, crate::error
// ============================================================================

//! ## Overview
//! The RunHeader carries the pipeline binding provenance, the policy
//! references, a best-effort git commit, and an environment fingerprint.
//! It is write-once: if the file exists it is trusted and never rewritten,
//! which is what keeps its hash usable as an invariance anchor. Stability
//! verdicts are stored separately and discovered through the
//! `stability_ref_pattern` convention.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use abraxas_core::canonical_json_bytes;
use abraxas_core::sha256_hex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::error::RuntimeError;
use crate::error::io_err;
use crate::error::json_err;

// ============================================================================
// SECTION: Environment Fingerprint
// ============================================================================

/// Captures the environment fingerprint embedded in the header.
///
/// Values are constant within a build on a machine, so they are safe inside
/// invariance-checked content.
fn env_fingerprint() -> Value {
    json!({
        "rust": {
            "crate_version": env!("CARGO_PKG_VERSION"),
        },
        "platform": {
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "family": std::env::consts::FAMILY,
        },
    })
}

/// Best-effort git commit hash; absence is explicit, never an error.
fn try_git_sha(repo_root: Option<&Path>) -> Option<String> {
    let mut command = Command::new("git");
    command.args(["rev-parse", "HEAD"]);
    if let Some(root) = repo_root {
        command.current_dir(root);
    }
    let output = command.output().ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() { None } else { Some(sha) }
}

// ============================================================================
// SECTION: Header Operations
// ============================================================================

/// Writes (or reuses) the `RunHeader.v0` for a run.
///
/// The header is trusted once it exists; repeated calls return the existing
/// path and hash unchanged.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the header cannot be encoded, written, or
/// read back.
pub fn ensure_run_header(
    artifacts_dir: &Path,
    run_id: &str,
    mode: &str,
    pipeline_bindings: &Value,
    policy_refs: &Value,
    repo_root: Option<&Path>,
) -> Result<(PathBuf, String), RuntimeError> {
    let out = artifacts_dir.join("runs").join(format!("{run_id}.runheader.json"));
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    if out.exists() {
        let bytes = fs::read(&out).map_err(|e| io_err(&out, e))?;
        return Ok((out, sha256_hex(&bytes)));
    }

    let header = json!({
        "schema": "RunHeader.v0",
        "run_id": run_id,
        "mode": mode,
        "code": {
            "git_sha": try_git_sha(repo_root),
        },
        "pipeline_bindings": pipeline_bindings,
        "policy_refs": policy_refs,
        "stability_ref_pattern": format!("runs/{run_id}.stability_ref.json"),
        "env": env_fingerprint(),
    });

    let bytes = canonical_json_bytes(&header)?;
    fs::write(&out, &bytes).map_err(|e| io_err(&out, e))?;
    tracing::debug!(run_id, path = %out.display(), "run header written");
    Ok((out, sha256_hex(&bytes)))
}

/// Loads a `RunHeader.v0`, checking its schema tag.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the header is missing, malformed, or tagged
/// with a different schema.
pub fn load_run_header(path: &Path) -> Result<Value, RuntimeError> {
    if !path.exists() {
        return Err(RuntimeError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let header: Value = serde_json::from_str(&text).map_err(|e| json_err(path, e))?;
    let found = header.get("schema").and_then(Value::as_str).unwrap_or_default();
    if found != "RunHeader.v0" {
        return Err(RuntimeError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: "RunHeader.v0".to_string(),
            found: found.to_string(),
        });
    }
    Ok(header)
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// Outcome of a hash verification against a file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    /// Whether the file matches the expected hash.
    pub valid: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Hash actually computed, when the file exists.
    pub actual_sha256: Option<String>,
}

/// Verifies a file against an expected content hash.
#[must_use]
pub fn verify_file_sha256(path: &Path, expected_sha256: &str, label: &str) -> VerifyOutcome {
    if !path.exists() {
        return VerifyOutcome {
            valid: false,
            reason: format!("{label} file missing: {}", path.display()),
            actual_sha256: None,
        };
    }
    let Ok(bytes) = fs::read(path) else {
        return VerifyOutcome {
            valid: false,
            reason: format!("{label} file unreadable: {}", path.display()),
            actual_sha256: None,
        };
    };
    let actual = sha256_hex(&bytes);
    if actual == expected_sha256 {
        VerifyOutcome {
            valid: true,
            reason: format!("{label} hash matches"),
            actual_sha256: Some(actual),
        }
    } else {
        VerifyOutcome {
            valid: false,
            reason: format!("{label} hash mismatch: expected {expected_sha256}, got {actual}"),
            actual_sha256: Some(actual),
        }
    }
}

/// Verifies a run header file against its expected hash.
#[must_use]
pub fn verify_run_header(path: &Path, expected_sha256: &str) -> VerifyOutcome {
    verify_file_sha256(path, expected_sha256, "RunHeader")
}
