// crates/abraxas-core/src/bindings.rs
// ============================================================================
// Module: Pipeline Bindings
// Description: Deterministic first-match resolution of pipeline callables.
// Purpose: Resolve forecast and shadow callables from an explicit registry.
// Dependencies: crate::scheduler, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The tick orchestrator needs three forecast callables (`run_signal`,
//! `run_compress`, `run_overlay`) and optionally a map of shadow tasks.
//! Resolution walks a fixed, ordered candidate list of
//! `(module_path, attribute)` locations over an explicit [`BindingRegistry`];
//! the first registered match wins. Missing any forecast callable is fatal
//! and the error lists every tried path. A missing shadow provider is not an
//! error: the shadow map is simply empty. Resolution happens once at startup;
//! nothing is looked up at tick time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::scheduler::TaskContext;
use crate::scheduler::TaskFailure;
use crate::scheduler::TaskOutput;

// ============================================================================
// SECTION: Callable Types
// ============================================================================

/// Deterministic pipeline callable taking the tick context.
pub type PipelineFn = Arc<dyn Fn(&TaskContext) -> Result<TaskOutput, TaskFailure> + Send + Sync>;

/// Provider returning the shadow task map, keyed by task name.
pub type ShadowProviderFn = Arc<dyn Fn() -> BTreeMap<String, PipelineFn> + Send + Sync>;

// ============================================================================
// SECTION: Binding Locations
// ============================================================================

/// A candidate location a callable may be registered under.
///
/// # Invariants
/// - Ordered comparison follows `(module_path, attribute)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BindingLocation {
    /// Module path the callable lives in.
    pub module_path: String,
    /// Attribute name within the module.
    pub attribute: String,
}

impl BindingLocation {
    /// Creates a binding location.
    #[must_use]
    pub fn new(module_path: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
            attribute: attribute.into(),
        }
    }
}

impl fmt::Display for BindingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module_path, self.attribute)
    }
}

/// Fixed candidate locations for the signal callable, in resolution order.
const SIGNAL_CANDIDATES: &[(&str, &str)] = &[
    ("abraxas_oracle::registry", "run_signal"),
    ("abraxas_oracle::signal", "run_signal"),
    ("abraxas_oracle::pipeline", "run_signal"),
    ("abraxas_engine::oracle", "run_signal"),
];

/// Fixed candidate locations for the compress callable, in resolution order.
const COMPRESS_CANDIDATES: &[(&str, &str)] = &[
    ("abraxas_oracle::registry", "run_compress"),
    ("abraxas_oracle::compression", "run_compress"),
    ("abraxas_oracle::pipeline", "run_compress"),
    ("abraxas_engine::oracle", "run_compress"),
];

/// Fixed candidate locations for the overlay callable, in resolution order.
const OVERLAY_CANDIDATES: &[(&str, &str)] = &[
    ("abraxas_oracle::registry", "run_overlay"),
    ("abraxas_oracle::overlays", "run_overlay"),
    ("abraxas_oracle::pipeline", "run_overlay"),
    ("abraxas_engine::oracle", "run_overlay"),
];

/// Fixed candidate locations for the shadow task provider, in resolution order.
const SHADOW_CANDIDATES: &[(&str, &str)] = &[
    ("abraxas_detectors::shadow_registry", "shadow_tasks"),
    ("abraxas_detectors::shadow", "shadow_tasks"),
    ("abraxas_runtime::shadow_bindings", "shadow_tasks"),
];

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Explicit registry of pipeline callables by location.
///
/// # Invariants
/// - Registration order is irrelevant; resolution order is the fixed
///   candidate list.
#[derive(Default)]
pub struct BindingRegistry {
    /// Registered callables by location.
    entries: BTreeMap<BindingLocation, PipelineFn>,
    /// Registered shadow providers by location.
    shadow_providers: BTreeMap<BindingLocation, ShadowProviderFn>,
}

impl BindingRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callable under a location, replacing any prior entry.
    pub fn register(&mut self, module_path: &str, attribute: &str, callable: PipelineFn) {
        self.entries.insert(BindingLocation::new(module_path, attribute), callable);
    }

    /// Registers a shadow task provider under a location.
    pub fn register_shadow_provider(
        &mut self,
        module_path: &str,
        attribute: &str,
        provider: ShadowProviderFn,
    ) {
        self.shadow_providers.insert(BindingLocation::new(module_path, attribute), provider);
    }

    /// Looks up a callable at an exact location.
    fn lookup(&self, module_path: &str, attribute: &str) -> Option<PipelineFn> {
        self.entries.get(&BindingLocation::new(module_path, attribute)).cloned()
    }

    /// Looks up a shadow provider at an exact location.
    fn lookup_shadow(&self, module_path: &str, attribute: &str) -> Option<ShadowProviderFn> {
        self.shadow_providers.get(&BindingLocation::new(module_path, attribute)).cloned()
    }
}

// ============================================================================
// SECTION: Resolved Bindings
// ============================================================================

/// Resolved pipeline bindings with provenance.
///
/// # Invariants
/// - All three forecast callables are present; the shadow map may be empty.
#[derive(Clone)]
pub struct PipelineBindings {
    /// Signal extraction callable.
    pub run_signal: PipelineFn,
    /// Compression callable.
    pub run_compress: PipelineFn,
    /// Overlay callable.
    pub run_overlay: PipelineFn,
    /// Shadow tasks keyed by name; empty when no provider matched.
    pub shadow_tasks: BTreeMap<String, PipelineFn>,
    /// Record of which locations matched, for run-level provenance.
    pub provenance: Value,
}

impl fmt::Debug for PipelineBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBindings")
            .field("shadow_tasks", &self.shadow_tasks.keys().collect::<Vec<_>>())
            .field("provenance", &self.provenance)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pipeline binding resolution failures.
///
/// # Invariants
/// - The unresolved variant lists every tried location.
#[derive(Debug, Error)]
pub enum BindingError {
    /// One or more forecast callables could not be resolved.
    #[error(
        "pipeline bindings unresolved; missing: {missing:?}; tried: {tried:?}; \
         shadow providers tried: {shadow_tried:?}"
    )]
    Unresolved {
        /// Names of the unresolved forecast callables.
        missing: Vec<String>,
        /// Every forecast location tried, in resolution order.
        tried: Vec<String>,
        /// Every shadow provider location tried, in resolution order.
        shadow_tried: Vec<String>,
    },
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Finds the first registered callable from a candidate list.
fn first_found(
    registry: &BindingRegistry,
    candidates: &[(&str, &str)],
    tried: &mut Vec<String>,
) -> Option<(PipelineFn, String)> {
    for (module_path, attribute) in candidates {
        let location = BindingLocation::new(*module_path, *attribute);
        tried.push(location.to_string());
        if let Some(callable) = registry.lookup(module_path, attribute) {
            return Some((callable, location.to_string()));
        }
    }
    None
}

/// Deterministically resolves the pipeline bindings from a registry.
///
/// Resolution order is fixed; the first registered match wins. The returned
/// provenance records which locations matched and the shadow task names.
///
/// # Errors
///
/// Returns [`BindingError::Unresolved`] listing every tried path when any of
/// the three forecast callables is missing.
pub fn resolve_pipeline_bindings(
    registry: &BindingRegistry,
) -> Result<PipelineBindings, BindingError> {
    let mut tried: Vec<String> = Vec::new();

    let signal = first_found(registry, SIGNAL_CANDIDATES, &mut tried);
    let compress = first_found(registry, COMPRESS_CANDIDATES, &mut tried);
    let overlay = first_found(registry, OVERLAY_CANDIDATES, &mut tried);

    let mut shadow_tried: Vec<String> = Vec::new();
    let mut shadow_tasks: BTreeMap<String, PipelineFn> = BTreeMap::new();
    let mut shadow_source: Option<String> = None;
    for (module_path, attribute) in SHADOW_CANDIDATES {
        let location = BindingLocation::new(*module_path, *attribute);
        shadow_tried.push(location.to_string());
        if let Some(provider) = registry.lookup_shadow(module_path, attribute) {
            shadow_tasks = provider();
            shadow_source = Some(location.to_string());
            break;
        }
    }

    let mut missing: Vec<String> = Vec::new();
    if signal.is_none() {
        missing.push("run_signal".to_string());
    }
    if compress.is_none() {
        missing.push("run_compress".to_string());
    }
    if overlay.is_none() {
        missing.push("run_overlay".to_string());
    }
    let (Some((run_signal, signal_source)), Some((run_compress, compress_source)), Some((
        run_overlay,
        overlay_source,
    ))) = (signal, compress, overlay)
    else {
        return Err(BindingError::Unresolved {
            missing,
            tried,
            shadow_tried,
        });
    };

    let provenance = json!({
        "bindings": "PipelineBindings.v0",
        "oracle": {
            "signal": signal_source,
            "compress": compress_source,
            "overlay": overlay_source,
        },
        "shadow": {
            "provider": shadow_source,
            "task_count": shadow_tasks.len(),
            "task_names": shadow_tasks.keys().cloned().collect::<Vec<_>>(),
        },
    });

    Ok(PipelineBindings {
        run_signal,
        run_compress,
        run_overlay,
        shadow_tasks,
        provenance,
    })
}
