// crates/abraxas-cli/src/seal_pipeline.rs
// ============================================================================
// Module: Seal Pipeline Bindings
// Description: Deterministic pipeline callables for seal and gate runs.
// Purpose: Minimal fixed-output tasks the release gates run against.
// Dependencies: abraxas-core, serde_json
// ============================================================================

//! ## Overview
//! Seal and gate runs need a pipeline whose outputs are fixed by
//! construction, so any hash drift they observe is a runtime bug rather
//! than a task artifact. The callables here return constant payloads and
//! register one shadow task, mirroring the minimal production wiring.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use abraxas_core::BindingRegistry;
use abraxas_core::PipelineBindings;
use abraxas_core::PipelineFn;
use abraxas_core::TaskOutput;
use abraxas_core::resolve_pipeline_bindings;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Bindings
// ============================================================================

/// Returns a callable producing the given static payload.
fn constant(value: Value) -> PipelineFn {
    Arc::new(move |_ctx| Ok(TaskOutput::Value(value.clone())))
}

/// Resolves the deterministic seal pipeline bindings.
///
/// # Panics
///
/// Never panics: all three forecast callables are registered at the
/// canonical locations before resolution.
#[must_use]
#[allow(
    clippy::expect_used,
    reason = "the forecast callables are registered immediately before resolution"
)]
pub fn seal_bindings() -> PipelineBindings {
    let mut registry = BindingRegistry::new();
    registry.register("abraxas_oracle::registry", "run_signal", constant(json!({"signal": 1})));
    registry.register(
        "abraxas_oracle::registry",
        "run_compress",
        constant(json!({"compress": 1})),
    );
    registry.register("abraxas_oracle::registry", "run_overlay", constant(json!({"overlay": 1})));
    registry.register_shadow_provider(
        "abraxas_detectors::shadow_registry",
        "shadow_tasks",
        Arc::new(|| {
            let mut tasks: BTreeMap<String, PipelineFn> = BTreeMap::new();
            tasks.insert("sei".to_string(), constant(json!({"sei": 0})));
            tasks
        }),
    );
    resolve_pipeline_bindings(&registry).expect("seal bindings resolve")
}
