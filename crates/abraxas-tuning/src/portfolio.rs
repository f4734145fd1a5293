// crates/abraxas-tuning/src/portfolio.rs
// ============================================================================
// Module: Tuning Portfolios
// Description: Portfolio schema, defaults, loader, and ACTIVE pointer swap.
// Purpose: Deterministic budget and concurrency knobs for acquisition.
// Dependencies: abraxas-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Portfolios are plain JSON documents under a base directory; `ACTIVE`
//! names the current one. Loading tolerates a missing pointer or target by
//! returning the defaults. The portfolio hash is the canonical-JSON SHA-256
//! of the full document and identifies a portfolio across renames.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use abraxas_core::CanonicalError;
use abraxas_core::canonical_json_string;
use abraxas_core::hash_canonical_json;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tuning portfolio failures.
///
/// # Invariants
/// - Filesystem errors carry the offending path.
#[derive(Debug, Error)]
pub enum TuningError {
    /// Filesystem operation failed.
    #[error("tuning io error at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Portfolio document failed to parse.
    #[error("invalid portfolio at {path}: {source}")]
    Parse {
        /// Path of the malformed document.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// Portfolio could not be canonically encoded.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

/// Wraps an IO error with its path.
fn io_err(path: &Path, source: std::io::Error) -> TuningError {
    TuningError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ============================================================================
// SECTION: Portfolio Schema
// ============================================================================

/// Policy gating the surgical (allow-listed proxy) fetch path.
///
/// # Invariants
/// - `max_requests` strictly caps surgical fetches per run.
/// - `manifest_only = true` confines surgical fetches to manifest discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodoPolicy {
    /// Maximum surgical requests per run.
    #[serde(default = "default_decodo_max_requests")]
    pub max_requests: u32,
    /// Whether surgical fetches are confined to manifest discovery.
    #[serde(default = "default_true")]
    pub manifest_only: bool,
}

impl Default for DecodoPolicy {
    fn default() -> Self {
        Self {
            max_requests: default_decodo_max_requests(),
            manifest_only: true,
        }
    }
}

/// Unified bulk-volume budgets for one acquisition run.
///
/// # Invariants
/// - Caps are declared values, enforced by the planner and transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UbvBudgets {
    /// Maximum plan steps per run.
    #[serde(default = "default_max_requests_per_run")]
    pub max_requests_per_run: u32,
    /// Maximum bytes fetched per run.
    #[serde(default = "default_max_bytes_per_run")]
    pub max_bytes_per_run: u64,
    /// Batch window label used for window derivation.
    #[serde(default = "default_batch_window")]
    pub batch_window: String,
    /// Surgical fetch policy.
    #[serde(default)]
    pub decodo_policy: DecodoPolicy,
}

impl Default for UbvBudgets {
    fn default() -> Self {
        Self {
            max_requests_per_run: default_max_requests_per_run(),
            max_bytes_per_run: default_max_bytes_per_run(),
            batch_window: default_batch_window(),
            decodo_policy: DecodoPolicy::default(),
        }
    }
}

/// Concurrency knobs for the parallel executor.
///
/// # Invariants
/// - `max_inflight_bytes = 0` disables the in-flight limiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineKnobs {
    /// Whether parallel execution is enabled at all.
    #[serde(default)]
    pub concurrency_enabled: bool,
    /// Worker count for the FETCH stage.
    #[serde(default = "default_workers")]
    pub max_workers_fetch: u32,
    /// Worker count for the PARSE stage.
    #[serde(default = "default_workers")]
    pub max_workers_parse: u32,
    /// In-flight byte cap shared by all workers of a stage.
    #[serde(default = "default_max_inflight_bytes")]
    pub max_inflight_bytes: u64,
}

impl Default for PipelineKnobs {
    fn default() -> Self {
        Self {
            concurrency_enabled: false,
            max_workers_fetch: default_workers(),
            max_workers_parse: default_workers(),
            max_inflight_bytes: default_max_inflight_bytes(),
        }
    }
}

/// Process-wide tuning portfolio.
///
/// # Invariants
/// - The portfolio hash is the canonical-JSON SHA-256 of the full document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioTuningIR {
    /// Stable portfolio identifier.
    #[serde(default = "default_portfolio_id")]
    pub portfolio_id: String,
    /// Acquisition budgets.
    #[serde(default)]
    pub ubv: UbvBudgets,
    /// Executor knobs.
    #[serde(default)]
    pub pipeline: PipelineKnobs,
}

impl Default for PortfolioTuningIR {
    fn default() -> Self {
        Self {
            portfolio_id: default_portfolio_id(),
            ubv: UbvBudgets::default(),
            pipeline: PipelineKnobs::default(),
        }
    }
}

impl PortfolioTuningIR {
    /// Computes the canonical content hash of the portfolio.
    ///
    /// # Errors
    ///
    /// Returns [`TuningError`] when the portfolio has no canonical encoding.
    pub fn portfolio_hash(&self) -> Result<String, TuningError> {
        Ok(hash_canonical_json(self)?)
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default portfolio identifier.
fn default_portfolio_id() -> String {
    "acquisition_default".to_string()
}

/// Default surgical request cap.
const fn default_decodo_max_requests() -> u32 {
    1
}

/// Serde helper returning `true`.
const fn default_true() -> bool {
    true
}

/// Default plan-step cap per run.
const fn default_max_requests_per_run() -> u32 {
    50
}

/// Default byte cap per run.
const fn default_max_bytes_per_run() -> u64 {
    10_000_000
}

/// Default batch window label.
fn default_batch_window() -> String {
    "daily".to_string()
}

/// Default per-stage worker count.
const fn default_workers() -> u32 {
    4
}

/// Default in-flight byte cap.
const fn default_max_inflight_bytes() -> u64 {
    50_000_000
}

// ============================================================================
// SECTION: Loader and ACTIVE Pointer
// ============================================================================

/// Loads a portfolio document from disk.
///
/// # Errors
///
/// Returns [`TuningError`] when the file is unreadable or malformed.
pub fn load_portfolio(path: &Path) -> Result<PortfolioTuningIR, TuningError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&text).map_err(|source| TuningError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the active portfolio, tolerating a missing pointer with defaults.
///
/// # Errors
///
/// Returns [`TuningError`] when a named target exists but is malformed.
pub fn load_active(base_dir: &Path) -> Result<PortfolioTuningIR, TuningError> {
    let pointer = base_dir.join("ACTIVE");
    if !pointer.exists() {
        return Ok(PortfolioTuningIR::default());
    }
    let target = fs::read_to_string(&pointer).map_err(|e| io_err(&pointer, e))?;
    let target = target.trim();
    if target.is_empty() {
        return Ok(PortfolioTuningIR::default());
    }
    let target_path = base_dir.join(target);
    if !target_path.exists() {
        return Ok(PortfolioTuningIR::default());
    }
    load_portfolio(&target_path)
}

/// Saves a portfolio as canonical JSON under `base_dir/<name>.json`.
///
/// # Errors
///
/// Returns [`TuningError`] when the document cannot be encoded or written.
pub fn save_portfolio(
    base_dir: &Path,
    name: &str,
    portfolio: &PortfolioTuningIR,
) -> Result<PathBuf, TuningError> {
    fs::create_dir_all(base_dir).map_err(|e| io_err(base_dir, e))?;
    let path = base_dir.join(format!("{name}.json"));
    let text = canonical_json_string(portfolio)?;
    fs::write(&path, text).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

/// Atomically points `ACTIVE` at a portfolio name.
///
/// Writes a sibling temp file and renames it over the pointer; readers see
/// exactly the old or the new name.
///
/// # Errors
///
/// Returns [`TuningError`] when the pointer cannot be written or renamed.
pub fn swap_active(base_dir: &Path, name: &str) -> Result<(), TuningError> {
    fs::create_dir_all(base_dir).map_err(|e| io_err(base_dir, e))?;
    let pointer = base_dir.join("ACTIVE");
    let staged = base_dir.join("ACTIVE.tmp");
    fs::write(&staged, name).map_err(|e| io_err(&staged, e))?;
    fs::rename(&staged, &pointer).map_err(|e| io_err(&pointer, e))?;
    Ok(())
}

/// Finds the portfolio file whose content hash matches, scanning in sorted
/// filename order.
///
/// # Errors
///
/// Returns [`TuningError`] when the base directory cannot be listed.
pub fn find_portfolio_by_hash(
    base_dir: &Path,
    portfolio_hash: &str,
) -> Result<Option<PathBuf>, TuningError> {
    if !base_dir.exists() {
        return Ok(None);
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(base_dir)
        .map_err(|e| io_err(base_dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();
    for path in paths {
        let Ok(portfolio) = load_portfolio(&path) else {
            continue;
        };
        if portfolio.portfolio_hash()? == portfolio_hash {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
