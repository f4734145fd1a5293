// crates/abraxas-runtime/src/error.rs
// ============================================================================
// Module: Runtime Errors
// Description: Error taxonomy for artifact emission and orchestration.
// Purpose: Stable behavioral kinds for tick, gate, and retention failures.
// Dependencies: abraxas-core, thiserror
// ============================================================================

//! ## Overview
//! Runtime failures either abort the operation (orchestration contract
//! violations, unreadable artifacts) or stay local (task failures, which are
//! recorded in the trace and never surface here). Filesystem errors always
//! carry the offending path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use abraxas_core::CanonicalError;
use abraxas_core::SchedulerError;
use thiserror::Error;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Runtime failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Filesystem operation failed.
    #[error("runtime io error at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Value could not be canonically encoded.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
    /// Artifact on disk failed to parse as JSON.
    #[error("invalid json at {path}: {source}")]
    Json {
        /// Path of the malformed artifact.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// Scheduler contract violation.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// Artifact carries an unexpected schema tag.
    #[error("schema mismatch at {path}: expected {expected}, found {found}")]
    SchemaMismatch {
        /// Path of the offending artifact.
        path: PathBuf,
        /// Schema the caller expected.
        expected: String,
        /// Schema found in the artifact.
        found: String,
    },
    /// Referenced artifact is not on disk.
    #[error("artifact missing at {path}")]
    MissingArtifact {
        /// Path that was expected to exist.
        path: PathBuf,
    },
    /// Gate runner broke its output contract.
    #[error("invariance gate contract violated: {reason}")]
    GateContract {
        /// Violation description.
        reason: String,
    },
    /// Overlay payload without the mandatory `no_influence` marker.
    #[error("overlay outputs must carry no_influence=true")]
    InfluenceViolation,
}

/// Wraps an IO error with its path.
pub(crate) fn io_err(path: &Path, source: std::io::Error) -> RuntimeError {
    RuntimeError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Wraps a JSON parse error with its path.
pub(crate) fn json_err(path: &Path, source: serde_json::Error) -> RuntimeError {
    RuntimeError::Json {
        path: path.to_path_buf(),
        source,
    }
}
