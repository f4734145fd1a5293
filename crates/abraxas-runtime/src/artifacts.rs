// crates/abraxas-runtime/src/artifacts.rs
// ============================================================================
// Module: Artifact Writer
// Description: Canonical JSON artifact writes with a per-run manifest ledger.
// Purpose: Give every emitted artifact a stable path, hash, and ledger entry.
// Dependencies: abraxas-core, serde, serde_json, crate::error
// ============================================================================

//! ## Overview
//! `write_json` serializes the artifact to canonical bytes, hashes them,
//! writes the file, and appends a record to the per-run manifest ledger.
//! The ledger is rewritten on every append in the stable sort order
//! `(tick, kind, schema, path)` through a temp-file-and-rename, so its
//! content is a pure function of its record set. Ledger paths are
//! artifacts-dir-relative; the absolute artifact path is returned to the
//! caller only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use abraxas_core::canonical_json_bytes;
use abraxas_core::sha256_hex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::RuntimeError;
use crate::error::io_err;
use crate::error::json_err;

// ============================================================================
// SECTION: Records
// ============================================================================

/// Record returned for every written artifact.
///
/// # Invariants
/// - `sha256` is the hash of the exact bytes on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Schema tag of the artifact.
    pub schema: String,
    /// Absolute path of the artifact.
    pub path: PathBuf,
    /// Artifacts-dir-relative path of the artifact.
    pub rel_path: String,
    /// Content hash of the written bytes.
    pub sha256: String,
    /// Written byte length.
    pub bytes: u64,
    /// Run the artifact belongs to.
    pub run_id: String,
    /// Tick the artifact belongs to.
    pub tick: u64,
    /// Artifact kind label.
    pub kind: String,
}

/// One manifest ledger record.
///
/// # Invariants
/// - `path` is artifacts-dir-relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRecord {
    /// Tick the artifact belongs to.
    pub tick: u64,
    /// Artifact kind label.
    pub kind: String,
    /// Schema tag of the artifact.
    pub schema: String,
    /// Artifacts-dir-relative artifact path.
    pub path: String,
    /// Content hash of the artifact bytes.
    pub sha256: String,
    /// Artifact byte length.
    pub bytes: u64,
    /// Caller-supplied extra metadata, keys sorted by encoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub extra: Option<Value>,
}

/// Per-run manifest ledger.
///
/// # Invariants
/// - `records` is sorted by `(tick, kind, schema, path)` on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestLedger {
    /// Schema tag, always `Manifest.v0`.
    pub schema: String,
    /// Run the ledger belongs to.
    pub run_id: String,
    /// Artifact records.
    pub records: Vec<ManifestRecord>,
}

/// Parameters naming one artifact write.
#[derive(Debug, Clone)]
pub struct ArtifactSpec {
    /// Run the artifact belongs to.
    pub run_id: String,
    /// Tick the artifact belongs to.
    pub tick: u64,
    /// Artifact kind label.
    pub kind: String,
    /// Schema tag of the artifact.
    pub schema: String,
    /// Artifacts-dir-relative output path.
    pub rel_path: String,
    /// Optional extra metadata for the ledger record.
    pub extra: Option<Map<String, Value>>,
}

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Artifact writer rooted at an artifacts directory.
///
/// # Invariants
/// - Ledger rewrites are serialized through a process-local lock and go
///   through temp-file-and-rename.
pub struct ArtifactWriter {
    /// Artifacts root directory.
    root: PathBuf,
    /// Process-local ledger rewrite lock.
    ledger_lock: Mutex<()>,
}

impl ArtifactWriter {
    /// Creates a writer rooted at the artifacts directory.
    #[must_use]
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: artifacts_dir.into(),
            ledger_lock: Mutex::new(()),
        }
    }

    /// Returns the artifacts root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes an artifact as canonical JSON and records it in the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the artifact has no canonical encoding
    /// or the artifact or ledger cannot be written.
    pub fn write_json<T: Serialize>(
        &self,
        spec: &ArtifactSpec,
        artifact: &T,
    ) -> Result<ArtifactRecord, RuntimeError> {
        let out_path = self.root.join(&spec.rel_path);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let bytes = canonical_json_bytes(artifact)?;
        fs::write(&out_path, &bytes).map_err(|e| io_err(&out_path, e))?;
        let sha256 = sha256_hex(&bytes);

        let record = ArtifactRecord {
            schema: spec.schema.clone(),
            path: out_path,
            rel_path: spec.rel_path.clone(),
            sha256: sha256.clone(),
            bytes: bytes.len() as u64,
            run_id: spec.run_id.clone(),
            tick: spec.tick,
            kind: spec.kind.clone(),
        };
        self.append_manifest(spec, &record)?;
        Ok(record)
    }

    /// Returns the ledger path for a run.
    #[must_use]
    pub fn manifest_path(&self, run_id: &str) -> PathBuf {
        self.root.join("manifests").join(format!("{run_id}.manifest.json"))
    }

    /// Appends a record and rewrites the ledger in stable order.
    fn append_manifest(
        &self,
        spec: &ArtifactSpec,
        record: &ArtifactRecord,
    ) -> Result<(), RuntimeError> {
        let guard = self.ledger_lock.lock();
        let ledger_path = self.manifest_path(&spec.run_id);
        if let Some(parent) = ledger_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let mut ledger = if ledger_path.exists() {
            read_manifest(&ledger_path)?
        } else {
            ManifestLedger {
                schema: "Manifest.v0".to_string(),
                run_id: spec.run_id.clone(),
                records: Vec::new(),
            }
        };

        ledger.records.push(ManifestRecord {
            tick: record.tick,
            kind: record.kind.clone(),
            schema: record.schema.clone(),
            path: record.rel_path.clone(),
            sha256: record.sha256.clone(),
            bytes: record.bytes,
            extra: spec.extra.clone().map(Value::Object),
        });
        sort_records(&mut ledger.records);

        write_manifest(&ledger_path, &ledger)?;
        drop(guard);
        Ok(())
    }
}

// ============================================================================
// SECTION: Ledger IO
// ============================================================================

/// Sorts ledger records into the stable order `(tick, kind, schema, path)`.
pub fn sort_records(records: &mut [ManifestRecord]) {
    records.sort_by(|a, b| {
        (a.tick, &a.kind, &a.schema, &a.path).cmp(&(b.tick, &b.kind, &b.schema, &b.path))
    });
}

/// Reads and parses a manifest ledger.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the ledger is unreadable or malformed.
pub fn read_manifest(path: &Path) -> Result<ManifestLedger, RuntimeError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&text).map_err(|e| json_err(path, e))
}

/// Writes a manifest ledger through temp-file-and-rename.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the ledger cannot be encoded or written.
pub fn write_manifest(path: &Path, ledger: &ManifestLedger) -> Result<(), RuntimeError> {
    let bytes = canonical_json_bytes(ledger)?;
    let staged = path.with_extension("json.tmp");
    fs::write(&staged, &bytes).map_err(|e| io_err(&staged, e))?;
    fs::rename(&staged, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
