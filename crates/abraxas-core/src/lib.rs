// crates/abraxas-core/src/lib.rs
// ============================================================================
// Module: Abraxas Core
// Description: Deterministic primitives for the Abraxas observational pipeline.
// Purpose: Canonical hashing, tick scheduling, work units, pipeline bindings.
// Dependencies: serde, serde_json, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! `abraxas-core` holds the determinism-sensitive primitives shared by every
//! other Abraxas crate: canonical JSON encoding with SHA-256 content hashing,
//! the lane-ordered tick scheduler with declared budgets, deterministic work
//! unit identity, trace canonicalization with an N-run invariance check, and
//! the explicit pipeline binding registry.
//!
//! Nothing in this crate reads the wall clock, spawns threads, or touches the
//! filesystem. Determinism is a construction property here, not a test-time
//! accident.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bindings;
pub mod hashing;
pub mod invariance;
pub mod scheduler;
pub mod trace;
pub mod work_unit;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bindings::BindingError;
pub use bindings::BindingLocation;
pub use bindings::BindingRegistry;
pub use bindings::PipelineBindings;
pub use bindings::PipelineFn;
pub use bindings::ShadowProviderFn;
pub use bindings::resolve_pipeline_bindings;
pub use hashing::CanonicalError;
pub use hashing::canonical_json_bytes;
pub use hashing::canonical_json_string;
pub use hashing::hash_canonical_json;
pub use hashing::sha256_hex;
pub use scheduler::Budget;
pub use scheduler::DeterministicScheduler;
pub use scheduler::Lane;
pub use scheduler::NotComputable;
pub use scheduler::RemainingBudgets;
pub use scheduler::SchedulerError;
pub use scheduler::TaskContext;
pub use scheduler::TaskFailure;
pub use scheduler::TaskFn;
pub use scheduler::TaskOutput;
pub use scheduler::TaskResult;
pub use scheduler::TaskSpec;
pub use scheduler::TaskStatus;
pub use scheduler::TickOutput;
pub use scheduler::TraceEvent;
pub use scheduler::bind_callable;
pub use work_unit::OrderingKey;
pub use work_unit::Stage;
pub use work_unit::WindowUtc;
pub use work_unit::WorkUnit;
