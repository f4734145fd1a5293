// crates/abraxas-core/src/work_unit.rs
// ============================================================================
// Module: Work Units
// Description: Deterministic unit identity for parallel pipeline stages.
// Purpose: Derive stable unit ids and a total ordering key per stage.
// Dependencies: crate::hashing, serde, serde_json
// ============================================================================

//! ## Overview
//! A work unit is the schedulable atom of the parallel executor. Its identity
//! is the SHA-256 of the canonical JSON of `(stage, source_id, window_utc,
//! key, input_refs)`; two units with identical identity fields have equal
//! `unit_id` and that equality is the sole basis for cross-run identity
//! checks. The ordering key strictly totally orders units within a stage and
//! defines the only commit order observable downstream.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::hashing::CanonicalError;
use crate::hashing::hash_canonical_json;

// ============================================================================
// SECTION: Stages
// ============================================================================

/// Parallel pipeline stage a work unit belongs to.
///
/// # Invariants
/// - Variants are stable for serialization and unit identity hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    /// Network or cache acquisition stage.
    Fetch,
    /// Raw-byte parsing stage.
    Parse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("FETCH"),
            Self::Parse => f.write_str("PARSE"),
        }
    }
}

// ============================================================================
// SECTION: Windows and Ordering Keys
// ============================================================================

/// UTC observation window bounds attached to a work unit.
///
/// # Invariants
/// - Bounds are RFC 3339 strings or absent; the core never parses the clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUtc {
    /// Inclusive window start.
    pub start: Option<String>,
    /// Inclusive window end.
    pub end: Option<String>,
}

impl WindowUtc {
    /// Creates a window from optional start and end bounds.
    #[must_use]
    pub const fn new(start: Option<String>, end: Option<String>) -> Self {
        Self {
            start,
            end,
        }
    }
}

/// Total ordering key for work units within a stage.
///
/// # Invariants
/// - Lexicographic comparison of the components is the commit order.
/// - Absent components are encoded as empty strings during construction.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct OrderingKey(pub Vec<String>);

impl OrderingKey {
    /// Creates an ordering key from its components.
    #[must_use]
    pub const fn new(components: Vec<String>) -> Self {
        Self(components)
    }

    /// Returns the key components.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for OrderingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

// ============================================================================
// SECTION: Work Units
// ============================================================================

/// Deterministic unit of work for a parallel stage.
///
/// # Invariants
/// - `unit_id` is the canonical hash of the five identity fields.
/// - `input_bytes` is a declared size used by the in-flight limiter only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    /// Canonical identity hash.
    pub unit_id: String,
    /// Stage the unit runs in.
    pub stage: Stage,
    /// Source the unit acquires or parses for.
    pub source_id: String,
    /// Observation window.
    pub window_utc: WindowUtc,
    /// Total ordering key within the stage.
    pub key: OrderingKey,
    /// References to the unit's inputs.
    pub input_refs: Value,
    /// Declared input size in bytes.
    pub input_bytes: u64,
}

impl WorkUnit {
    /// Builds a work unit, deriving its canonical identity hash.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when the identity fields have no canonical
    /// encoding.
    pub fn build(
        stage: Stage,
        source_id: impl Into<String>,
        window_utc: WindowUtc,
        key: OrderingKey,
        input_refs: Value,
        input_bytes: u64,
    ) -> Result<Self, CanonicalError> {
        let source_id = source_id.into();
        let unit_id = hash_canonical_json(&json!({
            "stage": stage,
            "source_id": &source_id,
            "window_utc": &window_utc,
            "key": &key,
            "input_refs": &input_refs,
        }))?;
        Ok(Self {
            unit_id,
            stage,
            source_id,
            window_utc,
            key,
            input_refs,
            input_bytes,
        })
    }
}
