// crates/abraxas-executor/src/config.rs
// ============================================================================
// Module: Concurrency Configuration
// Description: Effective worker counts and the in-flight byte cap.
// Purpose: Derive executor knobs from the active tuning portfolio.
// Dependencies: abraxas-core, abraxas-tuning, serde
// ============================================================================

//! ## Overview
//! The effective worker count for a stage is `1` when concurrency is
//! disabled, otherwise the stage's configured worker count already clamped
//! to the portfolio's request cap at construction time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use abraxas_core::Stage;
use abraxas_tuning::PortfolioTuningIR;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Executor concurrency configuration.
///
/// # Invariants
/// - `max_inflight_bytes = 0` disables the byte limiter.
/// - `deterministic_commit` is always honored; it exists for provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Whether worker threads are used at all.
    pub enabled: bool,
    /// Worker count for the FETCH stage.
    pub max_workers_fetch: u32,
    /// Worker count for the PARSE stage.
    pub max_workers_parse: u32,
    /// In-flight byte cap shared across a stage's workers.
    pub max_inflight_bytes: u64,
    /// Marker that results commit in key order.
    pub deterministic_commit: bool,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_workers_fetch: 4,
            max_workers_parse: 4,
            max_inflight_bytes: 50_000_000,
            deterministic_commit: true,
        }
    }
}

impl ConcurrencyConfig {
    /// Derives the configuration from a tuning portfolio.
    ///
    /// Worker counts are clamped to the portfolio's per-run request cap.
    #[must_use]
    pub fn from_portfolio(portfolio: &PortfolioTuningIR) -> Self {
        let cap = portfolio.ubv.max_requests_per_run.max(1);
        Self {
            enabled: portfolio.pipeline.concurrency_enabled,
            max_workers_fetch: portfolio.pipeline.max_workers_fetch.min(cap),
            max_workers_parse: portfolio.pipeline.max_workers_parse.min(cap),
            max_inflight_bytes: portfolio.pipeline.max_inflight_bytes,
            deterministic_commit: true,
        }
    }

    /// Returns the effective worker count for a stage.
    #[must_use]
    pub const fn workers_for_stage(&self, stage: Stage) -> u32 {
        if !self.enabled {
            return 1;
        }
        let workers = match stage {
            Stage::Fetch => self.max_workers_fetch,
            Stage::Parse => self.max_workers_parse,
        };
        if workers == 0 { 1 } else { workers }
    }
}
