// crates/abraxas-core/src/hashing.rs
// ============================================================================
// Module: Canonical Encoding and Hashing
// Description: Canonical JSON serialization and SHA-256 content hashing.
// Purpose: Provide the single byte encoding used for every artifact identity.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Every artifact equality and identity decision in Abraxas goes through this
//! module. Canonical bytes are produced by RFC 8785 JSON canonicalization:
//! UTF-8, lexicographically sorted object keys, no inter-token whitespace,
//! integers verbatim, floats in shortest round-trip form. Values that cannot
//! be canonically encoded (non-finite floats, non-string map keys) fail hard
//! rather than falling back to a lossy form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonical encoding failures.
///
/// # Invariants
/// - Raised instead of emitting a lossy or platform-dependent encoding.
#[derive(Debug, Error)]
pub enum CanonicalError {
    /// The value has no canonical JSON form (for example a NaN float).
    #[error("canonical JSON encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// SECTION: Canonical Encoding
// ============================================================================

/// Serializes a value into canonical JSON bytes.
///
/// # Errors
///
/// Returns [`CanonicalError`] when the value has no canonical encoding.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    Ok(serde_jcs::to_vec(value)?)
}

/// Serializes a value into a canonical JSON string.
///
/// # Errors
///
/// Returns [`CanonicalError`] when the value has no canonical encoding.
pub fn canonical_json_string<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    Ok(serde_jcs::to_string(value)?)
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Computes the lowercase hex SHA-256 digest of a byte sequence.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Computes the SHA-256 digest of a value's canonical JSON encoding.
///
/// # Errors
///
/// Returns [`CanonicalError`] when the value has no canonical encoding.
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonicalError> {
    Ok(sha256_hex(&canonical_json_bytes(value)?))
}
