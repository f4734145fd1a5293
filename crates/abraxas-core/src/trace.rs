// crates/abraxas-core/src/trace.rs
// ============================================================================
// Module: Trace Canonicalization
// Description: Deterministic JSON payloads and hashes for scheduler traces.
// Purpose: Give traces a stable byte form suitable for invariance checks.
// Dependencies: crate::hashing, crate::scheduler, serde_json
// ============================================================================

//! ## Overview
//! A trace is hashed by serializing its events, in execution order, into the
//! canonical JSON envelope `{"events": [...]}` and taking the SHA-256 of
//! those bytes. Two runs are byte-identical exactly when their canonical
//! trace payloads are.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::hashing::CanonicalError;
use crate::hashing::canonical_json_bytes;
use crate::hashing::sha256_hex;
use crate::scheduler::TraceEvent;

// ============================================================================
// SECTION: Canonical Trace Payloads
// ============================================================================

/// Produces the deterministic JSON payload for a trace.
///
/// Events are kept in execution order; only their encoding is normalized.
///
/// # Errors
///
/// Returns [`CanonicalError`] when an event's metadata has no canonical
/// encoding.
pub fn canonicalize_trace(trace: &[TraceEvent]) -> Result<Value, CanonicalError> {
    let events = serde_json::to_value(trace)?;
    Ok(json!({ "events": events }))
}

/// Serializes a trace into canonical JSON bytes.
///
/// # Errors
///
/// Returns [`CanonicalError`] when the trace has no canonical encoding.
pub fn trace_json_bytes(trace: &[TraceEvent]) -> Result<Vec<u8>, CanonicalError> {
    canonical_json_bytes(&canonicalize_trace(trace)?)
}

/// Computes the SHA-256 hash of a trace's canonical byte form.
///
/// # Errors
///
/// Returns [`CanonicalError`] when the trace has no canonical encoding.
pub fn trace_hash_sha256(trace: &[TraceEvent]) -> Result<String, CanonicalError> {
    Ok(sha256_hex(&trace_json_bytes(trace)?))
}
