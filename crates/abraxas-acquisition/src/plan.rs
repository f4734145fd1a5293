// crates/abraxas-acquisition/src/plan.rs
// ============================================================================
// Module: Bulk Pull Plans
// Description: Finite, ordered fetch plans derived from a manifest.
// Purpose: Canonical plan and step identities for deterministic execution.
// Dependencies: abraxas-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A plan is an ordered list of steps with strictly increasing
//! `order_index`. Step identity is the truncated canonical hash of
//! `{url, idx, source_id}`; plan identity is the canonical hash of the plan
//! payload without the id. For fixed inputs both are byte-stable across
//! runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use abraxas_core::CanonicalError;
use abraxas_core::WindowUtc;
use abraxas_core::hash_canonical_json;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

// ============================================================================
// SECTION: Steps
// ============================================================================

/// Action a plan step performs.
///
/// # Invariants
/// - Variants are stable for serialization and artifact matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanAction {
    /// Fetch the target into the CAS.
    #[serde(rename = "DOWNLOAD")]
    Download,
    /// Skip the target; it stays out of the work unit set.
    #[serde(rename = "SKIP")]
    Skip,
}

/// Cache requirement for a plan step.
///
/// # Invariants
/// - Variants are stable for serialization and artifact matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Step output must land in the CAS.
    #[serde(rename = "REQUIRED")]
    Required,
    /// Step output may be served without caching.
    #[serde(rename = "OPTIONAL")]
    Optional,
}

/// One fetch step of a bulk pull plan.
///
/// # Invariants
/// - `step_id` is the first sixteen hex characters of the canonical hash of
///   `{url, idx, source_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Truncated canonical identity of the step.
    pub step_id: String,
    /// Action to perform.
    pub action: PlanAction,
    /// Target URL or cache key.
    pub url_or_key: String,
    /// Expected body size, when the manifest advertises one.
    pub expected_bytes: Option<u64>,
    /// Cache requirement.
    pub cache_policy: CachePolicy,
    /// Strictly increasing position within the plan.
    pub order_index: u64,
}

impl PlanStep {
    /// Derives the truncated canonical step identity.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when the identity payload has no canonical
    /// encoding.
    pub fn derive_step_id(
        url: &str,
        idx: u64,
        source_id: &str,
    ) -> Result<String, CanonicalError> {
        let full = hash_canonical_json(&json!({
            "url": url,
            "idx": idx,
            "source_id": source_id,
        }))?;
        Ok(full.chars().take(16).collect())
    }
}

// ============================================================================
// SECTION: Plans
// ============================================================================

/// Finite, deterministically built fetch plan for one source and window.
///
/// # Invariants
/// - `steps` is sorted by `order_index`.
/// - `plan_id` is stable for identical planner inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPullPlan {
    /// Canonical identity of the plan.
    pub plan_id: String,
    /// Source the plan pulls for.
    pub source_id: String,
    /// Planner timestamp from the run context.
    pub created_at_utc: String,
    /// Observation window the plan covers.
    pub window_utc: WindowUtc,
    /// Identity of the manifest the plan was derived from.
    pub manifest_id: String,
    /// Ordered fetch steps.
    pub steps: Vec<PlanStep>,
}

impl BulkPullPlan {
    /// Builds a plan, deriving its canonical identity.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when the payload has no canonical encoding.
    pub fn build(
        source_id: impl Into<String>,
        created_at_utc: impl Into<String>,
        window_utc: WindowUtc,
        manifest_id: impl Into<String>,
        steps: Vec<PlanStep>,
    ) -> Result<Self, CanonicalError> {
        let source_id = source_id.into();
        let created_at_utc = created_at_utc.into();
        let manifest_id = manifest_id.into();
        let plan_id = hash_canonical_json(&json!({
            "source_id": &source_id,
            "created_at_utc": &created_at_utc,
            "window_utc": &window_utc,
            "manifest_id": &manifest_id,
            "steps": &steps,
        }))?;
        Ok(Self {
            plan_id,
            source_id,
            created_at_utc,
            window_utc,
            manifest_id,
            steps,
        })
    }

    /// Computes the canonical hash over the full plan, id included.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when the plan has no canonical encoding.
    pub fn plan_hash(&self) -> Result<String, CanonicalError> {
        hash_canonical_json(self)
    }
}
