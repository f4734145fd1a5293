// crates/abraxas-validate/src/lib.rs
// ============================================================================
// Module: Abraxas Validate
// Description: Schema-checked artifact validation and the seal report.
// Purpose: Prove a tick's artifact graph is well-formed and cross-linked.
// Dependencies: abraxas-core, abraxas-runtime, jsonschema, serde, serde_json
// ============================================================================

//! ## Overview
//! Validation is shallow: required fields, types, const values, string
//! patterns, nested object properties, and array item schemas. That is
//! enough to catch structural drift without re-deriving artifact semantics.
//! A tick validates from its RunIndex outward: follow the refs to TrendPack,
//! ResultsPack, and RunHeader, check the ViewPack at its conventional path,
//! and cross-check every event's result reference against the referenced
//! ResultsPack filename. The seal report rolls validation and the dozen-run
//! gate into one release verdict.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod schemas;
mod seal;
mod validator;

pub use schemas::ArtifactKind;
pub use seal::SealInputs;
pub use seal::write_seal_report;
pub use validator::TickValidation;
pub use validator::ValidationFailure;
pub use validator::ValidationResult;
pub use validator::validate_artifact;
pub use validator::validate_run;
pub use validator::validate_tick;
