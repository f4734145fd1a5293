// crates/abraxas-acquisition/src/sources.rs
// ============================================================================
// Module: Source Registry
// Description: Deterministic source specs with seeds and domain labels.
// Purpose: Resolve seed URLs and domains for a source identifier.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The registry maps source identifiers to their manifest seeds and bulk
//! endpoints. Discovery resolves seeds as explicit list first, then
//! `manifest_seeds ∪ bulk_endpoints` from the registry. Domain labels come
//! from an explicit override map, then stable identifier-prefix rules.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Source Specs
// ============================================================================

/// Registered source with its discovery endpoints.
///
/// # Invariants
/// - Seed lists are explicit; nothing is inferred from the identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Stable source identifier.
    pub source_id: String,
    /// Seed URLs for manifest discovery.
    pub manifest_seeds: Vec<String>,
    /// Bulk endpoints that double as discovery seeds.
    pub bulk_endpoints: Vec<String>,
}

/// Deterministic registry of sources and domain overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRegistry {
    /// Registered sources by identifier.
    sources: BTreeMap<String, SourceSpec>,
    /// Explicit domain overrides by identifier.
    domains: BTreeMap<String, String>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source spec, replacing any prior entry.
    pub fn insert(&mut self, spec: SourceSpec) {
        self.sources.insert(spec.source_id.clone(), spec);
    }

    /// Registers an explicit domain label for a source identifier.
    pub fn insert_domain(&mut self, source_id: impl Into<String>, domain: impl Into<String>) {
        self.domains.insert(source_id.into(), domain.into());
    }

    /// Looks up a registered source.
    #[must_use]
    pub fn get(&self, source_id: &str) -> Option<&SourceSpec> {
        self.sources.get(source_id)
    }

    /// Returns the discovery seeds for a source: manifest seeds followed by
    /// bulk endpoints, empty entries dropped.
    #[must_use]
    pub fn seeds_for(&self, source_id: &str) -> Vec<String> {
        let Some(spec) = self.sources.get(source_id) else {
            return Vec::new();
        };
        spec.manifest_seeds
            .iter()
            .chain(spec.bulk_endpoints.iter())
            .filter(|seed| !seed.is_empty())
            .cloned()
            .collect()
    }

    /// Returns the domain label for a source identifier.
    #[must_use]
    pub fn domain_for(&self, source_id: &str) -> String {
        self.domains
            .get(source_id)
            .cloned()
            .unwrap_or_else(|| domain_for_source_id(source_id).to_string())
    }
}

// ============================================================================
// SECTION: Domain Rules
// ============================================================================

/// Returns the stable domain label for a source identifier by prefix rule.
#[must_use]
pub fn domain_for_source_id(source_id: &str) -> &'static str {
    if source_id.starts_with("LINGUISTIC_") {
        "culture_memes"
    } else if source_id.starts_with("GOV_") {
        "geopolitics"
    } else if source_id.starts_with("ECON_") {
        "finance"
    } else if source_id.starts_with("NOAA_") {
        "climate_energy"
    } else if source_id.starts_with("NASA_") {
        "wildcards"
    } else {
        "unknown"
    }
}
