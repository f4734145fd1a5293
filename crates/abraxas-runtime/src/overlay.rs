// crates/abraxas-runtime/src/overlay.rs
// ============================================================================
// Module: Overlay Artifact Handler
// Description: Content-hashed storage for external overlay generations.
// Purpose: Enforce the observation-only contract for overlay outputs.
// Dependencies: serde_json, crate::{artifacts, error}
// ============================================================================

//! ## Overview
//! External overlay generators (Neon-Genie) run in the observation lane
//! only. Their outputs are stored as `NeonGenieGeneration.v0` artifacts with
//! SHA-256 provenance and the mandatory `no_influence=true` marker; a
//! payload without the marker is rejected outright. Nothing in the forecast
//! lane ever reads these artifacts back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;
use serde_json::json;

use crate::artifacts::ArtifactSpec;
use crate::artifacts::ArtifactWriter;
use crate::artifacts::read_manifest;
use crate::error::RuntimeError;

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// One overlay generation to store.
pub struct GenerationRecord<'a> {
    /// Run the generation belongs to.
    pub run_id: &'a str,
    /// Tick number for ordering.
    pub tick: u64,
    /// Original generation prompt.
    pub prompt: &'a str,
    /// Generated symbolic output, or null when not computable.
    pub generated_output: Value,
    /// Provenance envelope from the generator.
    pub provenance: Value,
    /// Generation metadata; must carry `no_influence: true`.
    pub metadata: Value,
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Stores overlay generations as observation-only artifacts.
///
/// # Invariants
/// - Every stored payload carries `no_influence=true`; violations are
///   rejected before any byte is written.
pub struct NeonGenieArtifactHandler {
    /// Writer rooted at the artifacts directory.
    writer: ArtifactWriter,
}

impl NeonGenieArtifactHandler {
    /// Creates a handler rooted at the artifacts directory.
    #[must_use]
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            writer: ArtifactWriter::new(artifacts_dir),
        }
    }

    /// Stores one generation result as a `NeonGenieGeneration.v0` artifact.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InfluenceViolation`] when the metadata lacks
    /// `no_influence: true`, and write failures otherwise.
    pub fn store_generation_result(
        &self,
        record: &GenerationRecord<'_>,
    ) -> Result<Value, RuntimeError> {
        let no_influence = record
            .metadata
            .get("no_influence")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !no_influence {
            return Err(RuntimeError::InfluenceViolation);
        }

        let artifact = json!({
            "schema": "NeonGenieGeneration.v0",
            "prompt": record.prompt,
            "generated_output": &record.generated_output,
            "provenance": &record.provenance,
            "metadata": &record.metadata,
        });

        let safe_run_id = record.run_id.replace('/', "_");
        let tick = record.tick;
        let rel_path = format!("neon_genie/{safe_run_id}/generation_{tick:04}.json");
        let lane = record
            .metadata
            .get("lane")
            .and_then(Value::as_str)
            .unwrap_or("OBSERVATION");

        let written = self.writer.write_json(
            &ArtifactSpec {
                run_id: record.run_id.to_string(),
                tick: record.tick,
                kind: "neon_genie_generation".to_string(),
                schema: "NeonGenieGeneration.v0".to_string(),
                rel_path,
                extra: json!({ "no_influence": true, "lane": lane })
                    .as_object()
                    .cloned(),
            },
            &artifact,
        )?;

        Ok(json!({
            "artifact_path": written.rel_path,
            "sha256": written.sha256,
            "bytes": written.bytes,
            "stored_at": written.tick,
            "no_influence": true,
        }))
    }

    /// Loads a stored generation artifact, when present.
    #[must_use]
    pub fn retrieve_generation(&self, rel_path: &str) -> Option<Value> {
        let path: &Path = &self.writer.root().join(rel_path);
        let text = fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Lists generation records for a run from the manifest ledger.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when an existing ledger cannot be read.
    pub fn list_generations(&self, run_id: &str) -> Result<Vec<Value>, RuntimeError> {
        let ledger_path = self.writer.manifest_path(run_id);
        if !ledger_path.exists() {
            return Ok(Vec::new());
        }
        let ledger = read_manifest(&ledger_path)?;
        let mut generations: Vec<Value> = Vec::new();
        for record in &ledger.records {
            if record.kind == "neon_genie_generation" {
                generations.push(serde_json::to_value(record).map_err(|e| {
                    crate::error::json_err(&ledger_path, e)
                })?);
            }
        }
        Ok(generations)
    }
}
