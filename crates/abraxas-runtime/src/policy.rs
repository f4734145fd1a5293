// crates/abraxas-runtime/src/policy.rs
// ============================================================================
// Module: Policy Snapshots and References
// Description: Immutable, content-addressed snapshots of policy state.
// Purpose: Every artifact can prove which policy governed its emission.
// Dependencies: abraxas-core, serde, serde_json, crate::error
// ============================================================================

//! ## Overview
//! A policy snapshot freezes the policy document (or its explicit absence)
//! at tick time. Snapshots are content-addressed: the filename embeds the
//! canonical hash, the file is written only when absent, and identical
//! content never produces two files. Policy references either point at an
//! immutable snapshot (`snapshot_path` + `snapshot_sha256`) or at a mutable
//! policy file whose later drift the verifier reports without ever failing
//! a write.

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
use serde_json::json;

use crate::error::RuntimeError;
use crate::error::io_err;
use crate::error::json_err;
use crate::run_header::VerifyOutcome;
use crate::run_header::verify_file_sha256;

// ============================================================================
// SECTION: Artifact Shapes
// ============================================================================

/// Immutable snapshot of one policy at emission time.
///
/// # Invariants
/// - `present = false` implies `policy_obj` is null; absence is explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    /// Schema tag, always `PolicySnapshot.v0`.
    pub schema: String,
    /// Policy name (for example `retention`).
    pub policy: String,
    /// Whether the source policy file existed.
    pub present: bool,
    /// Artifacts-dir-relative pattern of the source policy file.
    pub source_path_pattern: String,
    /// Parsed policy document, or null when absent.
    pub policy_obj: Value,
}

/// Reference to an immutable policy snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    /// Schema tag, always `PolicyRef.v0`.
    pub schema: String,
    /// Policy name.
    pub policy: String,
    /// Artifacts-dir-relative snapshot path.
    pub snapshot_path: String,
    /// Canonical hash of the snapshot content.
    pub snapshot_sha256: String,
}

// ============================================================================
// SECTION: Snapshot Operations
// ============================================================================

/// Builds the snapshot value for a policy file, reading it when present.
fn snapshot_value(policy_name: &str, policy_path: &Path) -> Result<PolicySnapshot, RuntimeError> {
    let source_path_pattern = format!("policy/{policy_name}.json");
    if !policy_path.exists() {
        return Ok(PolicySnapshot {
            schema: "PolicySnapshot.v0".to_string(),
            policy: policy_name.to_string(),
            present: false,
            source_path_pattern,
            policy_obj: Value::Null,
        });
    }
    let text = fs::read_to_string(policy_path).map_err(|e| io_err(policy_path, e))?;
    let policy_obj: Value = serde_json::from_str(&text).map_err(|e| json_err(policy_path, e))?;
    Ok(PolicySnapshot {
        schema: "PolicySnapshot.v0".to_string(),
        policy: policy_name.to_string(),
        present: true,
        source_path_pattern,
        policy_obj,
    })
}

/// Writes (or reuses) the content-addressed snapshot for a policy file.
///
/// Returns the artifacts-dir-relative snapshot path and its content hash.
/// Calling this twice with the same input returns the same pair; modifying
/// the policy file later never mutates an existing snapshot.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the policy file is malformed or the
/// snapshot cannot be encoded or written.
pub fn ensure_policy_snapshot(
    artifacts_dir: &Path,
    run_id: &str,
    policy_name: &str,
    policy_path: &Path,
) -> Result<(String, String), RuntimeError> {
    let snapshot = snapshot_value(policy_name, policy_path)?;
    let bytes = canonical_json_bytes(&snapshot)?;
    let hash = sha256_hex(&bytes);

    let rel_path = format!("policy_snapshots/{run_id}/{policy_name}.{hash}.policysnapshot.json");
    let out = artifacts_dir.join(&rel_path);
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if !out.exists() {
        fs::write(&out, &bytes).map_err(|e| io_err(&out, e))?;
    }
    Ok((rel_path, hash))
}

/// Creates a `PolicyRef.v0` pointing at an immutable snapshot.
#[must_use]
pub fn policy_ref_from_snapshot(
    policy: &str,
    snapshot_path: &str,
    snapshot_sha256: &str,
) -> PolicyRef {
    PolicyRef {
        schema: "PolicyRef.v0".to_string(),
        policy: policy.to_string(),
        snapshot_path: snapshot_path.to_string(),
        snapshot_sha256: snapshot_sha256.to_string(),
    }
}

/// Resolves a snapshot path pattern against the artifacts directory.
#[must_use]
pub fn resolve_snapshot_path(snapshot_path: &str, artifacts_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(snapshot_path);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    artifacts_dir.map_or_else(|| path.to_path_buf(), |dir| dir.join(path))
}

/// Loads a `PolicySnapshot.v0`, checking its schema tag.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the snapshot is missing, malformed, or
/// tagged with a different schema.
pub fn load_policy_snapshot(
    snapshot_path: &str,
    artifacts_dir: Option<&Path>,
) -> Result<PolicySnapshot, RuntimeError> {
    let path = resolve_snapshot_path(snapshot_path, artifacts_dir);
    if !path.exists() {
        return Err(RuntimeError::MissingArtifact {
            path,
        });
    }
    let text = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let snapshot: PolicySnapshot =
        serde_json::from_str(&text).map_err(|e| json_err(&path, e))?;
    if snapshot.schema != "PolicySnapshot.v0" {
        return Err(RuntimeError::SchemaMismatch {
            path,
            expected: "PolicySnapshot.v0".to_string(),
            found: snapshot.schema,
        });
    }
    Ok(snapshot)
}

/// Verifies a snapshot file against its expected hash.
///
/// A missing snapshot yields `valid = false` with a reason; it never aborts
/// the caller's writes.
#[must_use]
pub fn verify_policy_snapshot(
    snapshot_path: &str,
    expected_sha256: &str,
    artifacts_dir: Option<&Path>,
) -> VerifyOutcome {
    let path = resolve_snapshot_path(snapshot_path, artifacts_dir);
    verify_file_sha256(&path, expected_sha256, "PolicySnapshot")
}

// ============================================================================
// SECTION: Mutable-File References
// ============================================================================

/// Creates a reference to a mutable policy file with its current hash.
///
/// # Errors
///
/// Returns [`RuntimeError`] when an existing policy file cannot be read.
pub fn policy_ref_for_file(policy_name: &str, policy_path: &Path) -> Result<Value, RuntimeError> {
    if !policy_path.exists() {
        return Ok(json!({
            "schema": "PolicyRef.v0",
            "policy": policy_name,
            "path": policy_path.to_string_lossy(),
            "sha256": Value::Null,
            "present": false,
        }));
    }
    let bytes = fs::read(policy_path).map_err(|e| io_err(policy_path, e))?;
    Ok(json!({
        "schema": "PolicyRef.v0",
        "policy": policy_name,
        "path": policy_path.to_string_lossy(),
        "sha256": sha256_hex(&bytes),
        "present": true,
    }))
}

/// Drift verdict for a mutable-file policy reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDrift {
    /// Whether the reference itself was well-formed.
    pub valid: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Current hash of the policy file, when it exists.
    pub current_sha256: Option<String>,
    /// Hash recorded in the reference, when any.
    pub ref_sha256: Option<String>,
    /// Whether the policy changed since the artifact was emitted.
    pub drift: Option<bool>,
}

/// Verifies a mutable-file policy reference against current file state.
#[must_use]
pub fn verify_policy_ref(policy_ref: &Value, artifacts_dir: Option<&Path>) -> PolicyDrift {
    let schema = policy_ref.get("schema").and_then(Value::as_str).unwrap_or_default();
    if schema != "PolicyRef.v0" {
        return PolicyDrift {
            valid: false,
            reason: format!("invalid schema: {schema}"),
            current_sha256: None,
            ref_sha256: None,
            drift: None,
        };
    }
    let Some(path_pattern) = policy_ref
        .get("path_pattern")
        .or_else(|| policy_ref.get("path"))
        .and_then(Value::as_str)
    else {
        return PolicyDrift {
            valid: false,
            reason: "missing path_pattern in PolicyRef".to_string(),
            current_sha256: None,
            ref_sha256: None,
            drift: None,
        };
    };

    let path = resolve_snapshot_path(path_pattern, artifacts_dir);
    let ref_sha256 =
        policy_ref.get("sha256").and_then(Value::as_str).map(ToString::to_string);
    let ref_present = policy_ref.get("present").and_then(Value::as_bool).unwrap_or(false);

    if !path.exists() {
        let (reason, drift) = if ref_present {
            ("policy file was removed since artifact creation".to_string(), true)
        } else {
            ("policy file still absent (as at creation time)".to_string(), false)
        };
        return PolicyDrift {
            valid: true,
            reason,
            current_sha256: None,
            ref_sha256,
            drift: Some(drift),
        };
    }

    let Ok(bytes) = fs::read(&path) else {
        return PolicyDrift {
            valid: false,
            reason: format!("policy file unreadable: {}", path.display()),
            current_sha256: None,
            ref_sha256,
            drift: None,
        };
    };
    let current_sha256 = sha256_hex(&bytes);

    if !ref_present {
        return PolicyDrift {
            valid: true,
            reason: "policy file was created after artifact creation".to_string(),
            current_sha256: Some(current_sha256),
            ref_sha256,
            drift: Some(true),
        };
    }

    let unchanged = ref_sha256.as_deref() == Some(current_sha256.as_str());
    PolicyDrift {
        valid: true,
        reason: if unchanged {
            "policy unchanged since artifact creation".to_string()
        } else {
            "policy modified since artifact creation".to_string()
        },
        current_sha256: Some(current_sha256),
        ref_sha256,
        drift: Some(!unchanged),
    }
}
