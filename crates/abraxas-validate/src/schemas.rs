// crates/abraxas-validate/src/schemas.rs
// ============================================================================
// Module: Artifact Schemas
// Description: Embedded shallow JSON Schemas for the artifact kinds.
// Purpose: One schema document per artifact kind, pinned in code.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Schema documents are embedded as JSON literals and stay deliberately
//! shallow: they pin the schema tag, the required fields, basic types, hash
//! patterns, and the item shapes of the main arrays. Deeper semantic checks
//! belong to the components that produce the artifacts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Validated artifact kinds.
///
/// # Invariants
/// - Display labels match the schema tags embedded in artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `RunIndex.v0` per-tick reference index.
    RunIndex,
    /// `TrendPack.v0` per-tick timeline.
    TrendPack,
    /// `ResultsPack.v0` per-tick task outputs.
    ResultsPack,
    /// `RunHeader.v0` run-level provenance.
    RunHeader,
    /// `ViewPack.v0` per-tick overview.
    ViewPack,
    /// `PolicySnapshot.v0` immutable policy snapshot.
    PolicySnapshot,
    /// `RunStability.v0` persisted gate verdict.
    RunStability,
    /// `StabilityRef.v0` stability pointer.
    StabilityRef,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RunIndex => "RunIndex.v0",
            Self::TrendPack => "TrendPack.v0",
            Self::ResultsPack => "ResultsPack.v0",
            Self::RunHeader => "RunHeader.v0",
            Self::ViewPack => "ViewPack.v0",
            Self::PolicySnapshot => "PolicySnapshot.v0",
            Self::RunStability => "RunStability.v0",
            Self::StabilityRef => "StabilityRef.v0",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Schema Documents
// ============================================================================

/// Lowercase hex SHA-256 pattern.
const SHA256_PATTERN: &str = "^[0-9a-f]{64}$";

/// Returns the shallow schema document for an artifact kind.
#[must_use]
pub fn schema_for(kind: ArtifactKind) -> Value {
    match kind {
        ArtifactKind::RunIndex => json!({
            "type": "object",
            "required": ["schema", "run_id", "tick", "refs", "hashes", "provenance"],
            "properties": {
                "schema": {"const": "RunIndex.v0"},
                "run_id": {"type": "string"},
                "tick": {"type": "integer"},
                "refs": {
                    "type": "object",
                    "required": ["trendpack", "results_pack", "run_header"],
                    "properties": {
                        "trendpack": {"type": "string"},
                        "results_pack": {"type": "string"},
                        "run_header": {"type": "string"},
                        "viewpack": {"type": "string"},
                    },
                },
                "hashes": {
                    "type": "object",
                    "required": ["trendpack_sha256", "results_pack_sha256", "run_header_sha256"],
                    "properties": {
                        "trendpack_sha256": {"type": "string", "pattern": SHA256_PATTERN},
                        "results_pack_sha256": {"type": "string", "pattern": SHA256_PATTERN},
                        "run_header_sha256": {"type": "string", "pattern": SHA256_PATTERN},
                        "viewpack_sha256": {"type": "string", "pattern": SHA256_PATTERN},
                    },
                },
                "provenance": {"type": "object"},
            },
        }),
        ArtifactKind::TrendPack => json!({
            "type": "object",
            "required": [
                "version", "run_id", "tick", "provenance", "timeline", "budget",
                "errors", "skipped", "stats",
            ],
            "properties": {
                "version": {"const": "TrendPack.v0"},
                "run_id": {"type": "string"},
                "tick": {"type": "integer"},
                "provenance": {"type": "object"},
                "timeline": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["task", "lane", "status", "cost_ops", "cost_entropy"],
                        "properties": {
                            "task": {"type": "string"},
                            "lane": {"type": "string", "pattern": "^(forecast|shadow)$"},
                            "status": {
                                "type": "string",
                                "pattern": "^(ok|skipped_budget|error|not_computable)$",
                            },
                            "cost_ops": {"type": "integer"},
                            "cost_entropy": {"type": "integer"},
                            "meta": {"type": "object"},
                        },
                    },
                },
                "budget": {"type": "object"},
                "errors": {"type": "array"},
                "skipped": {"type": "array"},
                "stats": {"type": "object"},
            },
        }),
        ArtifactKind::ResultsPack => json!({
            "type": "object",
            "required": ["schema", "run_id", "tick", "items", "provenance"],
            "properties": {
                "schema": {"const": "ResultsPack.v0"},
                "run_id": {"type": "string"},
                "tick": {"type": "integer"},
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["task", "result"],
                        "properties": {
                            "task": {"type": "string"},
                            "result": {"type": "object"},
                        },
                    },
                },
                "provenance": {"type": "object"},
            },
        }),
        ArtifactKind::RunHeader => json!({
            "type": "object",
            "required": [
                "schema", "run_id", "mode", "code", "pipeline_bindings", "policy_refs",
                "stability_ref_pattern", "env",
            ],
            "properties": {
                "schema": {"const": "RunHeader.v0"},
                "run_id": {"type": "string"},
                "mode": {"type": "string"},
                "code": {"type": "object"},
                "pipeline_bindings": {"type": "object"},
                "policy_refs": {"type": "object"},
                "stability_ref_pattern": {"type": "string"},
                "env": {"type": "object"},
            },
        }),
        ArtifactKind::ViewPack => json!({
            "type": "object",
            "required": [
                "schema", "run_id", "tick", "mode", "trendpack_ref", "aggregates",
                "events", "resolved", "resolved_filter", "provenance",
            ],
            "properties": {
                "schema": {"const": "ViewPack.v0"},
                "run_id": {"type": "string"},
                "tick": {"type": "integer"},
                "mode": {"type": "string"},
                "trendpack_ref": {"type": "object"},
                "aggregates": {"type": "object"},
                "events": {"type": "array"},
                "resolved": {"type": "array"},
                "resolved_filter": {"type": "object"},
                "provenance": {"type": "object"},
            },
        }),
        ArtifactKind::PolicySnapshot => json!({
            "type": "object",
            "required": ["schema", "policy", "present", "source_path_pattern"],
            "properties": {
                "schema": {"const": "PolicySnapshot.v0"},
                "policy": {"type": "string"},
                "present": {"type": "boolean"},
                "source_path_pattern": {"type": "string"},
            },
        }),
        ArtifactKind::RunStability => json!({
            "type": "object",
            "required": ["schema", "run_id", "ok"],
            "properties": {
                "schema": {"const": "RunStability.v0"},
                "run_id": {"type": "string"},
                "ok": {"type": "boolean"},
            },
        }),
        ArtifactKind::StabilityRef => json!({
            "type": "object",
            "required": ["schema", "run_id", "runstability_path", "runstability_sha256"],
            "properties": {
                "schema": {"const": "StabilityRef.v0"},
                "run_id": {"type": "string"},
                "runstability_path": {"type": "string"},
                "runstability_sha256": {"type": "string", "pattern": SHA256_PATTERN},
            },
        }),
    }
}
