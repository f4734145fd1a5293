// crates/abraxas-runtime/src/lib.rs
// ============================================================================
// Module: Abraxas Runtime
// Description: Tick orchestration and the hash-linked artifact graph.
// Purpose: Emit a byte-reproducible artifact set per tick, with retention,
// stability, and invariance machinery around it.
// Dependencies: abraxas-core, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! The runtime owns the canonical stitch-point between the scheduler and
//! persisted artifacts: the tick orchestrator, the artifact writer with its
//! per-run manifest ledger, policy snapshots and references, the TrendPack,
//! ResultsPack, ViewPack, RunIndex, and RunHeader builders, the dozen-run
//! invariance gate with typed divergence reporting, persisted stability
//! verdicts, the retention pruner, and the observation-only overlay
//! artifact handler.
//!
//! The sanctioned time sources are the caller's explicit context timestamp
//! and the best-effort git commit captured once per run header. Wall-clock
//! values, thread ids, and hostnames never enter canonical artifact
//! content.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod artifacts;
mod error;
mod gate;
mod overlay;
mod policy;
mod resolve;
mod results;
mod retention;
mod run_header;
mod stability;
mod tick;
mod trendpack;
mod viewpack;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifacts::ArtifactRecord;
pub use artifacts::ArtifactSpec;
pub use artifacts::ArtifactWriter;
pub use artifacts::ManifestLedger;
pub use artifacts::ManifestRecord;
pub use artifacts::read_manifest;
pub use artifacts::sort_records;
pub use artifacts::write_manifest;
pub use error::RuntimeError;
pub use gate::Divergence;
pub use gate::DozenRunGateResult;
pub use gate::dozen_run_tick_invariance_gate;
pub use overlay::GenerationRecord;
pub use overlay::NeonGenieArtifactHandler;
pub use policy::PolicyDrift;
pub use policy::PolicyRef;
pub use policy::PolicySnapshot;
pub use policy::ensure_policy_snapshot;
pub use policy::load_policy_snapshot;
pub use policy::policy_ref_for_file;
pub use policy::policy_ref_from_snapshot;
pub use policy::resolve_snapshot_path;
pub use policy::verify_policy_ref;
pub use policy::verify_policy_snapshot;
pub use resolve::ResolvedEvent;
pub use resolve::Resolver;
pub use resolve::load_resultspack;
pub use resolve::load_trendpack;
pub use results::ResultRef;
pub use results::ResultsItem;
pub use results::ResultsPack;
pub use results::build_results_pack;
pub use results::make_result_ref;
pub use retention::ArtifactPruner;
pub use retention::PruneReport;
pub use retention::RetentionPolicy;
pub use retention::RunStats;
pub use run_header::VerifyOutcome;
pub use run_header::ensure_run_header;
pub use run_header::load_run_header;
pub use run_header::verify_run_header;
pub use stability::RunStability;
pub use stability::StabilityRef;
pub use stability::StabilitySummary;
pub use stability::gate_result_value;
pub use stability::load_run_stability;
pub use stability::read_run_stability;
pub use stability::read_stability_summary;
pub use stability::stability_exists;
pub use stability::verify_run_stability;
pub use stability::write_run_stability;
pub use stability::write_stability_ref;
pub use tick::FORECAST_BUDGET;
pub use tick::FORECAST_TASK_COST;
pub use tick::SHADOW_BUDGET;
pub use tick::SHADOW_TASK_COST;
pub use tick::TickArtifacts;
pub use tick::TickOutcome;
pub use tick::TickParams;
pub use tick::run_pipeline_tick;
pub use trendpack::BudgetSpend;
pub use trendpack::LaneSpend;
pub use trendpack::TimelineEvent;
pub use trendpack::TrendError;
pub use trendpack::TrendPack;
pub use trendpack::TrendSkipped;
pub use trendpack::TrendStats;
pub use trendpack::build_trendpack;
pub use viewpack::InvarianceSummary;
pub use viewpack::ViewPack;
pub use viewpack::ViewPackParams;
pub use viewpack::build_view_pack;
