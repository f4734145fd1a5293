// crates/abraxas-executor/src/parallel.rs
// ============================================================================
// Module: Parallel Execution
// Description: Worker-thread execution with deterministic commit ordering.
// Purpose: Make completion order unobservable to downstream components.
// Dependencies: abraxas-core, crate::config, crate::limiter, serde
// ============================================================================

//! ## Overview
//! Units are pulled from a shared queue by worker threads (free-for-all).
//! After all handlers complete, results are committed sorted by the unit
//! ordering key; that sort is the only order downstream components can
//! observe. A handler failure propagates after the stage drains, and when
//! several units fail the error of the smallest failing key is chosen so
//! the surfaced failure is itself deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use abraxas_core::OrderingKey;
use abraxas_core::Stage;
use abraxas_core::WorkUnit;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::config::ConcurrencyConfig;
use crate::limiter::ByteLimiter;

// ============================================================================
// SECTION: Results
// ============================================================================

/// Committed result of one work unit.
///
/// # Invariants
/// - `key` equals the originating unit's ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkResult {
    /// Canonical identity of the originating unit.
    pub unit_id: String,
    /// Ordering key of the originating unit.
    pub key: OrderingKey,
    /// References to the unit's outputs.
    pub output_refs: Value,
    /// Bytes the handler processed.
    pub bytes_processed: u64,
    /// Stage the unit ran in.
    pub stage: Stage,
}

/// Outcome of a parallel stage run.
///
/// # Invariants
/// - `results` are committed in unit key order.
/// - `wall_ms` and `workers_used` never enter canonical artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelExecutionResult {
    /// Results in commit (key) order.
    pub results: Vec<WorkResult>,
    /// Highest observed in-flight byte count.
    pub max_inflight_bytes: u64,
    /// Worker threads used for the stage.
    pub workers_used: u32,
    /// Wall time of the stage in milliseconds.
    pub wall_ms: u64,
}

/// Sorts results into the deterministic commit order.
#[must_use]
pub fn commit_results(mut results: Vec<WorkResult>) -> Vec<WorkResult> {
    results.sort_by(|a, b| a.key.cmp(&b.key));
    results
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Claims the next unclaimed unit index, if any.
fn claim(next_index: &Mutex<usize>, total: usize) -> Option<usize> {
    let mut guard = next_index.lock().ok()?;
    if *guard >= total {
        return None;
    }
    let index = *guard;
    *guard += 1;
    Some(index)
}

/// Executes work units, possibly in parallel, committing in key order.
///
/// The handler must be deterministic given the unit's inputs. Worker count
/// and completion interleaving cannot influence the committed sequence.
///
/// # Errors
///
/// Propagates the handler error of the smallest failing unit key; partial
/// completion is never reported.
pub fn execute_parallel<H, E>(
    units: Vec<WorkUnit>,
    config: &ConcurrencyConfig,
    stage: Stage,
    handler: H,
) -> Result<ParallelExecutionResult, E>
where
    H: Fn(&WorkUnit) -> Result<WorkResult, E> + Send + Sync,
    E: Send,
{
    if units.is_empty() {
        return Ok(ParallelExecutionResult {
            results: Vec::new(),
            max_inflight_bytes: 0,
            workers_used: 0,
            wall_ms: 0,
        });
    }

    let workers = config.workers_for_stage(stage);
    let limiter = ByteLimiter::new(config.max_inflight_bytes);
    let started = Instant::now();

    let next_index: Mutex<usize> = Mutex::new(0);
    let mut empty_slots: Vec<Option<Result<WorkResult, E>>> = Vec::with_capacity(units.len());
    empty_slots.resize_with(units.len(), || None);
    let slots: Mutex<Vec<Option<Result<WorkResult, E>>>> = Mutex::new(empty_slots);

    thread::scope(|scope| {
        for _ in 0 .. workers {
            scope.spawn(|| {
                while let Some(index) = claim(&next_index, units.len()) {
                    let unit = &units[index];
                    limiter.acquire(unit.input_bytes);
                    let outcome = handler(unit);
                    limiter.release(unit.input_bytes);
                    if let Ok(mut guard) = slots.lock() {
                        guard[index] = Some(outcome);
                    }
                }
            });
        }
    });

    let mut collected = slots.into_inner().unwrap_or_default();

    // Visit units in key order so the surfaced failure is deterministic.
    let mut order: Vec<usize> = (0 .. units.len()).collect();
    order.sort_by(|&a, &b| units[a].key.cmp(&units[b].key));

    let mut committed: Vec<WorkResult> = Vec::with_capacity(units.len());
    for &index in &order {
        match collected.get_mut(index).and_then(Option::take) {
            Some(Ok(result)) => committed.push(result),
            Some(Err(error)) => return Err(error),
            None => {}
        }
    }

    Ok(ParallelExecutionResult {
        results: commit_results(committed),
        max_inflight_bytes: limiter.peak(),
        workers_used: workers,
        wall_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}
