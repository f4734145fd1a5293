// crates/abraxas-tuning/src/lib.rs
// ============================================================================
// Module: Abraxas Tuning
// Description: Process-wide tuning portfolios with an atomic ACTIVE pointer.
// Purpose: Budget caps, worker counts, and the in-flight byte limit.
// Dependencies: abraxas-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A tuning portfolio groups the acquisition budgets (request and byte caps,
//! the surgical-fetch policy) with the pipeline knobs (worker counts, the
//! in-flight byte cap). The currently active portfolio is named by an
//! `ACTIVE` pointer file; the pointer swap writes a sibling temp file and
//! renames it over the pointer, so readers observe exactly the old or the
//! new name, never a partial one. A missing pointer yields the default
//! portfolio.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod portfolio;

pub use portfolio::DecodoPolicy;
pub use portfolio::PipelineKnobs;
pub use portfolio::PortfolioTuningIR;
pub use portfolio::TuningError;
pub use portfolio::UbvBudgets;
pub use portfolio::find_portfolio_by_hash;
pub use portfolio::load_active;
pub use portfolio::load_portfolio;
pub use portfolio::save_portfolio;
pub use portfolio::swap_active;
