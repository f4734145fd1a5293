// crates/abraxas-acquisition/src/transport.rs
// ============================================================================
// Module: Acquisition Transport
// Description: Bulk, surgical, and cache-only fetch paths into the CAS.
// Purpose: Bounded HTTP acquisition with strict limits and no redirects.
// Dependencies: abraxas-cas, reqwest, url, tracing
// ============================================================================

//! ## Overview
//! All network fetches go through a blocking HTTP client with an explicit
//! timeout, redirects disabled, and a hard response byte cap; responses
//! over the cap fail closed. The surgical path routes through an
//! allow-listed proxy and exists solely for policy-gated manifest rescue;
//! an unconfigured proxy makes surgical fetches fail with a typed error.
//! Fetched bodies land in the CAS under `raw/` with the retrieval method in
//! the URL index metadata.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use abraxas_cas::CasRef;
use abraxas_cas::CasStore;
use abraxas_cas::UrlIndexMeta;
use abraxas_tuning::PortfolioTuningIR;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde_json::Map;
use serde_json::Value;
use url::Url;

use crate::error::AcquisitionError;
use crate::manifest::RetrievalMethod;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Transport configuration.
///
/// # Invariants
/// - Redirects are never followed.
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - `allow_http = false` blocks cleartext `http://` URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Full-request timeout.
    pub timeout: Duration,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: u64,
    /// User agent string for outbound requests.
    pub user_agent: String,
    /// Allow cleartext HTTP (enabled; sources are predominantly plain
    /// mirrors).
    pub allow_http: bool,
    /// Allow-listed proxy URL for the surgical path.
    pub surgical_proxy: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_response_bytes: 10_000_000,
            user_agent: "abraxas/0.1".to_string(),
            allow_http: true,
            surgical_proxy: None,
        }
    }
}

impl TransportConfig {
    /// Derives the configuration from the active tuning portfolio.
    #[must_use]
    pub fn from_portfolio(portfolio: &PortfolioTuningIR) -> Self {
        Self {
            max_response_bytes: portfolio.ubv.max_bytes_per_run,
            ..Self::default()
        }
    }
}

// ============================================================================
// SECTION: Fetch Results
// ============================================================================

/// Outcome of an acquisition fetch, staged into the CAS.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Requested URL.
    pub url: String,
    /// HTTP status code (`200` for cache-only reads).
    pub status_code: u16,
    /// Response content type.
    pub content_type: String,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// CAS reference of the staged body.
    pub raw_ref: CasRef,
    /// Retrieval method used.
    pub method: RetrievalMethod,
    /// Whether the surgical path was used.
    pub decodo_used: bool,
}

// ============================================================================
// SECTION: Transport
// ============================================================================

/// Raw response body with its transport metadata.
struct FetchBody {
    /// HTTP status code.
    status: u16,
    /// Response content type.
    content_type: String,
    /// Response bytes, already capped.
    body: Vec<u8>,
}

/// Bounded HTTP transport with bulk and surgical clients.
pub struct Transport {
    /// Direct HTTP client.
    client: Client,
    /// Proxy-routed client for the surgical path, when configured.
    surgical: Option<Client>,
    /// Transport limits and policy.
    config: TransportConfig,
}

impl Transport {
    /// Builds the transport clients from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::ClientBuild`] when a client cannot be
    /// constructed.
    pub fn new(config: TransportConfig) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AcquisitionError::ClientBuild {
                reason: e.to_string(),
            })?;
        let surgical = match &config.surgical_proxy {
            Some(proxy_url) => {
                let proxy = reqwest::Proxy::all(proxy_url.as_str()).map_err(|e| {
                    AcquisitionError::ClientBuild {
                        reason: e.to_string(),
                    }
                })?;
                Some(
                    Client::builder()
                        .timeout(config.timeout)
                        .redirect(Policy::none())
                        .user_agent(config.user_agent.clone())
                        .proxy(proxy)
                        .build()
                        .map_err(|e| AcquisitionError::ClientBuild {
                            reason: e.to_string(),
                        })?,
                )
            }
            None => None,
        };
        Ok(Self {
            client,
            surgical,
            config,
        })
    }

    /// Validates a URL against the scheme policy.
    fn check_scheme(&self, url: &str) -> Result<(), AcquisitionError> {
        let parsed = Url::parse(url).map_err(|e| AcquisitionError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        match parsed.scheme() {
            "https" => Ok(()),
            "http" if self.config.allow_http => Ok(()),
            _ => Err(AcquisitionError::SchemeNotAllowed {
                url: url.to_string(),
            }),
        }
    }

    /// Issues a bounded GET through the given client.
    fn fetch_with(&self, client: &Client, url: &str) -> Result<FetchBody, AcquisitionError> {
        self.check_scheme(url)?;
        let response = client.get(url).send().map_err(|e| AcquisitionError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let limit = self.config.max_response_bytes;
        let mut body: Vec<u8> = Vec::new();
        response.take(limit.saturating_add(1)).read_to_end(&mut body).map_err(|e| {
            AcquisitionError::Http {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;
        if body.len() as u64 > limit {
            return Err(AcquisitionError::BodyTooLarge {
                url: url.to_string(),
                limit,
            });
        }
        Ok(FetchBody {
            status: status.as_u16(),
            content_type,
            body,
        })
    }

    /// Issues a direct (bulk) fetch.
    fn fetch_bulk(&self, url: &str) -> Result<FetchBody, AcquisitionError> {
        self.fetch_with(&self.client, url)
    }

    /// Issues a proxy-routed (surgical) fetch.
    fn fetch_surgical(&self, url: &str) -> Result<FetchBody, AcquisitionError> {
        let Some(client) = &self.surgical else {
            return Err(AcquisitionError::SurgicalUnavailable {
                url: url.to_string(),
            });
        };
        self.fetch_with(client, url)
    }
}

// ============================================================================
// SECTION: Acquire Helpers
// ============================================================================

/// Builds URL index metadata for a staged fetch.
fn index_meta(
    url: &str,
    source_id: &str,
    method: RetrievalMethod,
    recorded_at_utc: Option<&str>,
) -> Result<UrlIndexMeta, AcquisitionError> {
    let mut meta: Map<String, Value> = Map::new();
    meta.insert("source_id".to_string(), Value::String(source_id.to_string()));
    meta.insert("method".to_string(), serde_json::to_value(method).map_err(|e| {
        AcquisitionError::Canonical(abraxas_core::CanonicalError::Encode(e))
    })?);
    Ok(UrlIndexMeta {
        url: url.to_string(),
        recorded_at_utc: recorded_at_utc.map(ToString::to_string),
        meta,
    })
}

/// Fetches a URL directly and stages the body into the CAS.
///
/// # Errors
///
/// Returns [`AcquisitionError`] on transport failure or CAS write failure.
pub fn acquire_bulk(
    transport: &Transport,
    url: &str,
    source_id: &str,
    cas: &CasStore,
    recorded_at_utc: Option<&str>,
) -> Result<FetchResult, AcquisitionError> {
    let fetched = transport.fetch_bulk(url)?;
    tracing::debug!(url, bytes = fetched.body.len(), "bulk fetch complete");
    let raw_ref = cas.put_bytes(
        &fetched.body,
        "raw",
        ".bin",
        Some(index_meta(url, source_id, RetrievalMethod::Bulk, recorded_at_utc)?),
    )?;
    Ok(FetchResult {
        url: url.to_string(),
        status_code: fetched.status,
        content_type: fetched.content_type,
        body: fetched.body,
        raw_ref,
        method: RetrievalMethod::Bulk,
        decodo_used: false,
    })
}

/// Fetches a URL through the allow-listed proxy and stages the body.
///
/// # Errors
///
/// Returns [`AcquisitionError`] on transport failure, missing proxy
/// configuration, or CAS write failure.
pub fn acquire_surgical(
    transport: &Transport,
    url: &str,
    source_id: &str,
    cas: &CasStore,
    recorded_at_utc: Option<&str>,
) -> Result<FetchResult, AcquisitionError> {
    let fetched = transport.fetch_surgical(url)?;
    tracing::debug!(url, bytes = fetched.body.len(), "surgical fetch complete");
    let raw_ref = cas.put_bytes(
        &fetched.body,
        "raw",
        ".bin",
        Some(index_meta(url, source_id, RetrievalMethod::Surgical, recorded_at_utc)?),
    )?;
    Ok(FetchResult {
        url: url.to_string(),
        status_code: fetched.status,
        content_type: fetched.content_type,
        body: fetched.body,
        raw_ref,
        method: RetrievalMethod::Surgical,
        decodo_used: true,
    })
}

/// Serves a URL from a prior CAS entry without any network traffic.
///
/// # Errors
///
/// Returns [`AcquisitionError`] when the index is unreadable or the indexed
/// blob is missing.
pub fn acquire_cache_only(
    url: &str,
    cas: &CasStore,
) -> Result<Option<FetchResult>, AcquisitionError> {
    let Some(entry) = cas.lookup_url(url)? else {
        return Ok(None);
    };
    let path = PathBuf::from(&entry.path);
    let body = std::fs::read(&path).map_err(|source| AcquisitionError::CacheRead {
        path,
        source,
    })?;
    let raw_ref = CasRef {
        content_hash: entry.content_hash,
        path: entry.path,
        bytes: body.len() as u64,
        subdir: entry.subdir,
        suffix: entry.suffix,
    };
    Ok(Some(FetchResult {
        url: url.to_string(),
        status_code: 200,
        content_type: "application/octet-stream".to_string(),
        body,
        raw_ref,
        method: RetrievalMethod::CacheOnly,
        decodo_used: false,
    }))
}
