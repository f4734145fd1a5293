// crates/abraxas-acquisition/src/discovery.rs
// ============================================================================
// Module: Manifest Discovery
// Description: Budgeted, cache-first discovery of source manifests.
// Purpose: Aggregate per-seed parses into one manifest artifact in the CAS.
// Dependencies: crate::{manifest, parse, perf, sources, transport}, tracing
// ============================================================================

//! ## Overview
//! Seeds resolve from the explicit list or the source registry and are
//! visited in sorted order. Each seed is served cache-first, then via a bulk
//! fetch, and finally, when policy allows and budget remains, via a single
//! surgical fetch. Per-seed failures become structured entries with a
//! `reason_code`; they never abort the aggregation. When every seed fails
//! the manifest is still written with an empty URL list and callers decide
//! whether to proceed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use abraxas_cas::CasRef;
use abraxas_cas::CasStore;
use abraxas_core::hash_canonical_json;
use abraxas_tuning::PortfolioTuningIR;
use serde_json::Value;
use serde_json::json;

use crate::error::AcquisitionError;
use crate::execute::RunContext;
use crate::manifest::ManifestArtifact;
use crate::manifest::ManifestKind;
use crate::manifest::ManifestProvenance;
use crate::manifest::RetrievalMethod;
use crate::manifest::SeedManifestEntry;
use crate::parse::parse_index_html;
use crate::parse::parse_json_listing;
use crate::parse::parse_rss;
use crate::parse::parse_sitemap_xml;
use crate::perf::PerfLedger;
use crate::sources::SourceRegistry;
use crate::transport::FetchResult;
use crate::transport::Transport;
use crate::transport::acquire_bulk;
use crate::transport::acquire_cache_only;
use crate::transport::acquire_surgical;

// ============================================================================
// SECTION: Request and Result
// ============================================================================

/// Inputs to one manifest discovery.
pub struct DiscoveryRequest<'a> {
    /// Source the discovery runs for.
    pub source_id: &'a str,
    /// Explicit seed URLs; falls back to the registry when absent.
    pub seed_targets: Option<&'a [String]>,
    /// Run context supplying `run_id` and `now_utc`.
    pub run_ctx: &'a RunContext,
    /// Active tuning budgets.
    pub budgets: &'a PortfolioTuningIR,
    /// Whether the surgical path may be used at all.
    pub allow_decodo: bool,
}

/// Outcome of one manifest discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDiscoveryResult {
    /// Aggregated manifest artifact.
    pub manifest: ManifestArtifact,
    /// Aggregate raw-hash summary `{hash, count}`.
    pub raw_ref: Value,
    /// CAS reference of the persisted manifest blob.
    pub parsed_ref: CasRef,
}

// ============================================================================
// SECTION: Seed Fetching
// ============================================================================

/// Fetches one seed cache-first, then bulk, then optionally surgical.
///
/// Returns the fetch result (when any) and the structured reason code.
fn fetch_seed(
    seed: &str,
    source_id: &str,
    run_ctx: &RunContext,
    cas: &CasStore,
    transport: &Transport,
    allow_surgical: bool,
    surgical_remaining: u32,
) -> Result<(Option<FetchResult>, Option<String>), AcquisitionError> {
    if let Some(cached) = acquire_cache_only(seed, cas)? {
        return Ok((Some(cached), Some("cache_hit".to_string())));
    }

    let bulk_reason = match acquire_bulk(
        transport,
        seed,
        source_id,
        cas,
        Some(run_ctx.now_utc.as_str()),
    ) {
        Ok(result) => return Ok((Some(result), None)),
        Err(error) => format!("bulk_failed:{}", error.kind()),
    };

    if allow_surgical && surgical_remaining > 0 {
        match acquire_surgical(transport, seed, source_id, cas, Some(run_ctx.now_utc.as_str())) {
            Ok(result) => return Ok((Some(result), Some("decodo".to_string()))),
            Err(error) => {
                return Ok((None, Some(format!("surgical_failed:{}:{bulk_reason}", error.kind()))));
            }
        }
    }

    Ok((None, Some(bulk_reason)))
}

// ============================================================================
// SECTION: Body Classification
// ============================================================================

/// Decodes a body as strict UTF-8, falling back to Latin-1.
///
/// Latin-1 never fails and maps every byte 1:1 to a character, so legacy
/// non-UTF-8 seed bodies keep their exact byte content instead of having
/// runs replaced.
fn decode_text(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => body.iter().map(|&byte| char::from(byte)).collect(),
    }
}

/// Classifies a body and parses its URL list.
fn classify_and_parse(raw_text: &str) -> (ManifestKind, Vec<String>, Option<String>) {
    let text = raw_text.trim();
    if text.is_empty() {
        return (ManifestKind::Unknown, Vec::new(), Some("empty".to_string()));
    }

    if text.contains("<urlset") || text.contains("<sitemapindex") {
        let urls = parse_sitemap_xml(text);
        let notes = urls.is_empty().then(|| "sitemap_parse_failed".to_string());
        return (ManifestKind::Sitemap, urls, notes);
    }
    if text.contains("<rss") || text.contains("<feed") {
        let urls = parse_rss(text);
        let notes = urls.is_empty().then(|| "rss_parse_failed".to_string());
        return (ManifestKind::RssIndex, urls, notes);
    }

    let urls = parse_json_listing(text);
    if !urls.is_empty() {
        return (ManifestKind::ApiListing, urls, None);
    }

    let urls = parse_index_html(text);
    if !urls.is_empty() {
        return (ManifestKind::IndexHtml, urls, None);
    }

    (ManifestKind::Unknown, Vec::new(), Some("unrecognized_format".to_string()))
}

/// Combines per-seed kinds: a single unique kind wins, anything else is
/// UNKNOWN.
fn combine_kinds(kinds: &[ManifestKind]) -> ManifestKind {
    let unique: BTreeSet<ManifestKind> = kinds.iter().copied().collect();
    if unique.len() == 1 {
        unique.into_iter().next().unwrap_or(ManifestKind::Unknown)
    } else {
        ManifestKind::Unknown
    }
}

/// Derives the aggregate retrieval method: surgical > bulk > cache_only.
fn derive_retrieval_method(entries: &[SeedManifestEntry]) -> RetrievalMethod {
    let methods: BTreeSet<RetrievalMethod> =
        entries.iter().filter_map(|entry| entry.retrieval_method).collect();
    if methods.contains(&RetrievalMethod::Surgical) {
        RetrievalMethod::Surgical
    } else if methods.contains(&RetrievalMethod::Bulk) {
        RetrievalMethod::Bulk
    } else {
        RetrievalMethod::CacheOnly
    }
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Discovers a source manifest from its seeds.
///
/// # Errors
///
/// Returns [`AcquisitionError::NoSeeds`] when no seeds resolve, and
/// propagates CAS or ledger failures. Per-seed transport failures are
/// recorded, not raised.
pub fn discover_manifest(
    request: &DiscoveryRequest<'_>,
    cas: &CasStore,
    transport: &Transport,
    perf_ledger: &PerfLedger,
    registry: &SourceRegistry,
) -> Result<ManifestDiscoveryResult, AcquisitionError> {
    let mut seeds: Vec<String> = match request.seed_targets {
        Some(targets) => targets.to_vec(),
        None => registry.seeds_for(request.source_id),
    };
    if seeds.is_empty() {
        return Err(AcquisitionError::NoSeeds {
            source_id: request.source_id.to_string(),
        });
    }
    seeds.sort();

    let allow_surgical =
        request.allow_decodo && request.budgets.ubv.decodo_policy.manifest_only;
    let mut surgical_remaining = request.budgets.ubv.decodo_policy.max_requests;

    let mut seed_entries: Vec<SeedManifestEntry> = Vec::with_capacity(seeds.len());
    let mut urls_union: BTreeSet<String> = BTreeSet::new();

    for seed in &seeds {
        let (fetched, reason_code) = fetch_seed(
            seed,
            request.source_id,
            request.run_ctx,
            cas,
            transport,
            allow_surgical,
            surgical_remaining,
        )?;

        let Some(fetched) = fetched else {
            tracing::warn!(seed = %seed, reason = ?reason_code, "seed fetch failed");
            seed_entries.push(SeedManifestEntry {
                seed_url: seed.clone(),
                kind: ManifestKind::Unknown,
                urls: Vec::new(),
                raw_hash: None,
                raw_bytes: None,
                cache_path: None,
                retrieval_method: None,
                decodo_used: false,
                reason_code: None,
                parse_notes: None,
                error: Some(reason_code.unwrap_or_else(|| "fetch_failed".to_string())),
            });
            continue;
        };

        if fetched.decodo_used {
            surgical_remaining = surgical_remaining.saturating_sub(1);
        }

        let raw_text = decode_text(&fetched.body);
        let (kind, parsed_urls, parse_notes) = classify_and_parse(&raw_text);
        urls_union.extend(parsed_urls.iter().cloned());

        perf_ledger.record(&json!({
            "ts": &request.run_ctx.now_utc,
            "event": "manifest_fetch",
            "source_id": request.source_id,
            "seed_url": seed,
            "bytes": fetched.raw_ref.bytes,
            "method": fetched.method,
            "decodo_used": fetched.decodo_used,
            "reason_code": &reason_code,
        }))?;

        seed_entries.push(SeedManifestEntry {
            seed_url: seed.clone(),
            kind,
            urls: parsed_urls,
            raw_hash: Some(fetched.raw_ref.content_hash.clone()),
            raw_bytes: Some(fetched.raw_ref.bytes),
            cache_path: Some(fetched.raw_ref.path.clone()),
            retrieval_method: Some(fetched.method),
            decodo_used: fetched.decodo_used,
            reason_code,
            parse_notes,
            error: None,
        });
    }

    let urls: Vec<String> = urls_union.into_iter().collect();
    let kinds: Vec<ManifestKind> = seed_entries.iter().map(|entry| entry.kind).collect();
    let kind = combine_kinds(&kinds);
    let raw_hashes: Vec<Option<String>> =
        seed_entries.iter().map(|entry| entry.raw_hash.clone()).collect();
    let raw_hash = hash_canonical_json(&raw_hashes)?;
    let parse_hash = hash_canonical_json(&json!({ "kind": kind, "urls": &urls }))?;

    let metadata = json!({
        "seed_manifests": &seed_entries,
        "seed_count": seed_entries.len(),
    });

    let parsed_ref = cas.put_json(
        &json!({
            "source_id": request.source_id,
            "kind": kind,
            "urls": &urls,
            "metadata": &metadata,
            "retrieved_at_utc": &request.run_ctx.now_utc,
        }),
        "manifests",
        ".json",
        None,
    )?;

    let provenance = ManifestProvenance {
        retrieval_method: derive_retrieval_method(&seed_entries),
        decodo_used: seed_entries.iter().any(|entry| entry.decodo_used),
        reason_code: None,
        raw_hash: raw_hash.clone(),
        parse_hash,
        cache_path: parsed_ref.path.clone(),
    };

    let manifest = ManifestArtifact::build(
        request.source_id,
        request.run_ctx.now_utc.clone(),
        kind,
        urls,
        metadata,
        provenance,
    )?;
    tracing::info!(
        source_id = request.source_id,
        kind = %manifest.kind,
        url_count = manifest.urls.len(),
        "manifest discovered"
    );

    Ok(ManifestDiscoveryResult {
        manifest,
        raw_ref: json!({ "hash": raw_hash, "count": seed_entries.len() }),
        parsed_ref,
    })
}
