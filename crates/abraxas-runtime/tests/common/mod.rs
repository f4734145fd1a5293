// crates/abraxas-runtime/tests/common/mod.rs
// ============================================================================
// Module: Runtime Test Helpers
// Description: Shared deterministic pipeline bindings for runtime tests.
// ============================================================================
//! ## Overview
//! Deterministic stub callables wired through the binding registry, so
//! every runtime test exercises the same resolution path the orchestrator
//! uses in production.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Shared helpers are compiled per test binary; not all are used by each."
)]

use std::collections::BTreeMap;
use std::sync::Arc;

use abraxas_core::BindingRegistry;
use abraxas_core::PipelineBindings;
use abraxas_core::PipelineFn;
use abraxas_core::TaskFailure;
use abraxas_core::TaskOutput;
use abraxas_core::resolve_pipeline_bindings;
use serde_json::json;

/// Returns a callable producing the given static payload.
pub fn constant(value: serde_json::Value) -> PipelineFn {
    Arc::new(move |_ctx| Ok(TaskOutput::Value(value.clone())))
}

/// Registers the three deterministic forecast callables.
fn register_forecast(registry: &mut BindingRegistry) {
    registry.register("abraxas_oracle::registry", "run_signal", constant(json!({"signal": 1})));
    registry.register(
        "abraxas_oracle::registry",
        "run_compress",
        constant(json!({"compress": 1})),
    );
    registry.register("abraxas_oracle::registry", "run_overlay", constant(json!({"overlay": 1})));
}

/// Resolves bindings with the forecast lane only.
pub fn stub_bindings() -> PipelineBindings {
    let mut registry = BindingRegistry::new();
    register_forecast(&mut registry);
    resolve_pipeline_bindings(&registry).expect("resolve stub bindings")
}

/// Resolves bindings with a deterministic shadow task map.
pub fn shadow_bindings() -> PipelineBindings {
    let mut registry = BindingRegistry::new();
    register_forecast(&mut registry);
    registry.register_shadow_provider(
        "abraxas_detectors::shadow_registry",
        "shadow_tasks",
        Arc::new(|| {
            let mut tasks: BTreeMap<String, PipelineFn> = BTreeMap::new();
            tasks.insert("sei".to_string(), constant(json!({"sei": 0})));
            tasks.insert("anagram".to_string(), constant(json!({"anagram": 0})));
            tasks
        }),
    );
    resolve_pipeline_bindings(&registry).expect("resolve shadow bindings")
}

/// Resolves bindings whose overlay task fails every tick.
pub fn failing_overlay_bindings() -> PipelineBindings {
    let mut registry = BindingRegistry::new();
    registry.register("abraxas_oracle::registry", "run_signal", constant(json!({"signal": 1})));
    registry.register(
        "abraxas_oracle::registry",
        "run_compress",
        constant(json!({"compress": 1})),
    );
    registry.register(
        "abraxas_oracle::registry",
        "run_overlay",
        Arc::new(|_ctx| Err(TaskFailure::new("OverlayError", "overlay backend unavailable"))),
    );
    resolve_pipeline_bindings(&registry).expect("resolve failing bindings")
}
