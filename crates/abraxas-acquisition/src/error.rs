// crates/abraxas-acquisition/src/error.rs
// ============================================================================
// Module: Acquisition Errors
// Description: Error taxonomy for transport, discovery, and plan execution.
// Purpose: Stable behavioral kinds surfaced into seed and step records.
// Dependencies: abraxas-cas, abraxas-core, thiserror
// ============================================================================

//! ## Overview
//! Per-seed and per-step failure records embed a short stable kind string
//! (`reason_code` entries such as `bulk_failed:HttpStatus`), so every
//! variant exposes its kind via [`AcquisitionError::kind`]. Transport
//! failures are per-seed or per-step; they never abort a whole discovery
//! aggregation on their own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use abraxas_cas::CasError;
use abraxas_core::CanonicalError;
use thiserror::Error;

// ============================================================================
// SECTION: Error Type
// ============================================================================

/// Acquisition failures.
///
/// # Invariants
/// - `kind()` strings are stable; they appear in persisted reason codes.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// CAS operation failed.
    #[error(transparent)]
    Cas(#[from] CasError),
    /// Value could not be canonically encoded.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
    /// HTTP client could not be constructed.
    #[error("http client build failed: {reason}")]
    ClientBuild {
        /// Builder failure description.
        reason: String,
    },
    /// Transport-level HTTP failure (connect, timeout, TLS).
    #[error("http fetch failed for {url}: {reason}")]
    Http {
        /// Requested URL.
        url: String,
        /// Transport failure description.
        reason: String,
    },
    /// Server answered with a non-success status.
    #[error("http status {status} for {url}")]
    HttpStatus {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// Response body exceeded the configured byte cap.
    #[error("response for {url} exceeded {limit} bytes")]
    BodyTooLarge {
        /// Requested URL.
        url: String,
        /// Configured byte cap.
        limit: u64,
    },
    /// URL scheme is not allowed by the transport policy.
    #[error("scheme not allowed for {url}")]
    SchemeNotAllowed {
        /// Rejected URL.
        url: String,
    },
    /// Surgical fetch requested but no proxy is configured.
    #[error("surgical transport unavailable for {url}")]
    SurgicalUnavailable {
        /// Requested URL.
        url: String,
    },
    /// Cached blob referenced by the URL index is unreadable.
    #[error("cache read failed at {path}: {source}")]
    CacheRead {
        /// Blob path from the index entry.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Discovery had no seeds to work from.
    #[error("manifest discovery requires seed targets or registry seeds for {source_id}")]
    NoSeeds {
        /// Source the discovery ran for.
        source_id: String,
    },
    /// Perf ledger append failed.
    #[error("perf ledger append failed at {path}: {source}")]
    Perf {
        /// Ledger path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

impl AcquisitionError {
    /// Returns the stable behavioral kind of the error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Cas(_) => "Cas",
            Self::Canonical(_) => "Canonical",
            Self::ClientBuild {
                ..
            } => "ClientBuild",
            Self::Http {
                ..
            } => "Http",
            Self::HttpStatus {
                ..
            } => "HttpStatus",
            Self::BodyTooLarge {
                ..
            } => "BodyTooLarge",
            Self::SchemeNotAllowed {
                ..
            } => "SchemeNotAllowed",
            Self::SurgicalUnavailable {
                ..
            } => "SurgicalUnavailable",
            Self::CacheRead {
                ..
            } => "CacheRead",
            Self::NoSeeds {
                ..
            } => "NoSeeds",
            Self::Perf {
                ..
            } => "Perf",
        }
    }
}
