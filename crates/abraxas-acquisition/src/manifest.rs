// crates/abraxas-acquisition/src/manifest.rs
// ============================================================================
// Module: Manifest Artifacts
// Description: Source manifest schema with canonical content identity.
// Purpose: Persist the discovered URL union with provenance and a stable id.
// Dependencies: abraxas-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A manifest is the union of URLs discovered from a source's seed
//! endpoints, classified by format. Its identity (`manifest_id`) is the
//! SHA-256 of the canonical payload built from everything except the id
//! itself, so two discoveries over identical inputs produce the same id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use abraxas_core::CanonicalError;
use abraxas_core::hash_canonical_json;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Kinds and Methods
// ============================================================================

/// Classified format of a manifest body.
///
/// # Invariants
/// - Variants are stable for serialization and artifact matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ManifestKind {
    /// Sitemap XML (`urlset` / `sitemapindex`).
    #[serde(rename = "SITEMAP")]
    Sitemap,
    /// RSS or Atom feed index.
    #[serde(rename = "RSS_INDEX")]
    RssIndex,
    /// HTML index page with anchor links.
    #[serde(rename = "INDEX_HTML")]
    IndexHtml,
    /// JSON API listing.
    #[serde(rename = "API_LISTING")]
    ApiListing,
    /// Unrecognized or failed body.
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sitemap => "SITEMAP",
            Self::RssIndex => "RSS_INDEX",
            Self::IndexHtml => "INDEX_HTML",
            Self::ApiListing => "API_LISTING",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// How a body was retrieved.
///
/// # Invariants
/// - Variants are stable for serialization and reason-code derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    /// Direct HTTP fetch.
    Bulk,
    /// Policy-gated fetch through the allow-listed proxy.
    Surgical,
    /// Served from a prior CAS entry without any network traffic.
    CacheOnly,
}

// ============================================================================
// SECTION: Provenance and Seed Entries
// ============================================================================

/// Provenance attached to a manifest artifact.
///
/// # Invariants
/// - `raw_hash` covers the per-seed raw content hashes in seed order.
/// - `parse_hash` covers the classified kind and the sorted URL union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestProvenance {
    /// Strongest retrieval method used across seeds.
    pub retrieval_method: RetrievalMethod,
    /// Whether any seed used the surgical path.
    pub decodo_used: bool,
    /// Aggregate-level reason code, when any.
    pub reason_code: Option<String>,
    /// Canonical hash over the per-seed raw hashes.
    pub raw_hash: String,
    /// Canonical hash over the classified kind and URL union.
    pub parse_hash: String,
    /// CAS path of the persisted manifest blob.
    pub cache_path: String,
}

/// Per-seed record embedded in the manifest metadata.
///
/// # Invariants
/// - Failed seeds carry `error` and an empty URL list; they never abort the
///   aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedManifestEntry {
    /// Seed URL that was fetched.
    pub seed_url: String,
    /// Classified format of the seed body.
    pub kind: ManifestKind,
    /// URLs parsed out of the seed body.
    pub urls: Vec<String>,
    /// Content hash of the raw seed body, when fetched.
    pub raw_hash: Option<String>,
    /// Raw body length in bytes, when fetched.
    pub raw_bytes: Option<u64>,
    /// CAS path of the raw seed body, when fetched.
    pub cache_path: Option<String>,
    /// Retrieval method used for the seed, when fetched.
    pub retrieval_method: Option<RetrievalMethod>,
    /// Whether the surgical path served the seed.
    pub decodo_used: bool,
    /// Structured reason code for the retrieval outcome.
    pub reason_code: Option<String>,
    /// Parser diagnostics, when any.
    pub parse_notes: Option<String>,
    /// Failure marker for seeds that could not be fetched.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Manifest Artifact
// ============================================================================

/// Discovered manifest for one source.
///
/// # Invariants
/// - `urls` is sorted and deduplicated.
/// - `manifest_id` is stable for identical discovery inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestArtifact {
    /// Canonical identity of the manifest.
    pub manifest_id: String,
    /// Source the manifest was discovered for.
    pub source_id: String,
    /// Discovery timestamp from the run context.
    pub retrieved_at_utc: String,
    /// Classified format of the manifest.
    pub kind: ManifestKind,
    /// Sorted, deduplicated URL union across seeds.
    pub urls: Vec<String>,
    /// Seed-level metadata.
    pub metadata: Value,
    /// Aggregate provenance.
    pub provenance: ManifestProvenance,
}

impl ManifestArtifact {
    /// Builds a manifest, deriving its canonical identity.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when the payload has no canonical encoding.
    pub fn build(
        source_id: impl Into<String>,
        retrieved_at_utc: impl Into<String>,
        kind: ManifestKind,
        urls: Vec<String>,
        metadata: Value,
        provenance: ManifestProvenance,
    ) -> Result<Self, CanonicalError> {
        let source_id = source_id.into();
        let retrieved_at_utc = retrieved_at_utc.into();
        let manifest_id = hash_canonical_json(&json!({
            "source_id": &source_id,
            "retrieved_at_utc": &retrieved_at_utc,
            "kind": kind,
            "urls": &urls,
            "metadata": &metadata,
            "provenance": &provenance,
        }))?;
        Ok(Self {
            manifest_id,
            source_id,
            retrieved_at_utc,
            kind,
            urls,
            metadata,
            provenance,
        })
    }

    /// Computes the canonical hash over the full manifest, id included.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when the manifest has no canonical
    /// encoding.
    pub fn manifest_hash(&self) -> Result<String, CanonicalError> {
        hash_canonical_json(self)
    }
}
