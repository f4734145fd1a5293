// crates/abraxas-core/src/scheduler.rs
// ============================================================================
// Module: Deterministic Tick Scheduler
// Description: Lane-ordered task execution under declared per-tick budgets.
// Purpose: Produce identical traces and result maps across independent runs.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The scheduler executes tasks strictly sequentially in a fixed total order:
//! `(lane_rank, priority, name, insertion_index)` with the forecast lane
//! ranked before the shadow lane. Budgets are declared, not measured; a task
//! that cannot be afforded is recorded as `skipped_budget` and deducts
//! nothing. Task failures are local: they are recorded in the trace and the
//! remaining tasks still run.
//!
//! This module does not read the wall clock and holds no hidden state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Lanes and Statuses
// ============================================================================

/// Execution lane for a scheduled task.
///
/// # Invariants
/// - Variants are stable for serialization and artifact matching.
/// - All forecast events precede all shadow events within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Primary analysis lane executed first each tick.
    Forecast,
    /// Observation-only lane whose outputs never influence later decisions.
    Shadow,
}

impl Lane {
    /// Returns the lane rank used in the task ordering key.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Forecast => 0,
            Self::Shadow => 1,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forecast => f.write_str("forecast"),
            Self::Shadow => f.write_str("shadow"),
        }
    }
}

/// Outcome status of a scheduled task attempt.
///
/// # Invariants
/// - Variants are stable for serialization and artifact matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task ran and returned a value.
    Ok,
    /// Task could not be afforded within the lane budget.
    SkippedBudget,
    /// Task ran and failed.
    Error,
    /// Task ran but its required inputs were absent.
    NotComputable,
}

// ============================================================================
// SECTION: Budgets
// ============================================================================

/// Deterministic budget envelope for a single tick lane.
///
/// # Invariants
/// - `ops` and `entropy` are declared costs, never measured ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Abstract work units available to the lane.
    pub ops: i64,
    /// Abstract complexity cost available to the lane.
    pub entropy: i64,
}

impl Budget {
    /// Creates a budget with the given ops and entropy allowances.
    #[must_use]
    pub const fn new(ops: i64, entropy: i64) -> Self {
        Self {
            ops,
            entropy,
        }
    }

    /// Returns whether the budget can afford the given declared costs.
    #[must_use]
    pub const fn can_afford(&self, ops: i64, entropy: i64) -> bool {
        ops <= self.ops && entropy <= self.entropy
    }
}

/// Per-lane budgets remaining after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingBudgets {
    /// Remaining forecast-lane budget.
    pub forecast: Budget,
    /// Remaining shadow-lane budget.
    pub shadow: Budget,
}

// ============================================================================
// SECTION: Task Outputs and Failures
// ============================================================================

/// Structured non-error outcome for a task whose inputs were absent.
///
/// # Invariants
/// - `missing_inputs` names the inputs that prevented computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotComputable {
    /// Human-readable reason the task could not compute.
    pub reason: String,
    /// Names of the inputs that were missing.
    pub missing_inputs: Vec<String>,
}

/// Value returned by a task callable.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    /// Deterministic JSON value produced by the task.
    Value(Value),
    /// Structured not-computable outcome.
    NotComputable(NotComputable),
}

/// Failure raised inside a task callable.
///
/// # Invariants
/// - Formats as `"<kind>: <message>"` in traces and result packs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TaskFailure {
    /// Stable failure kind identifier.
    pub kind: String,
    /// Human-readable failure message.
    pub message: String,
}

impl TaskFailure {
    /// Creates a task failure with the given kind and message.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Context value handed to every task callable within a tick.
pub type TaskContext = Value;

/// Deterministic task callable.
pub type TaskFn = Arc<dyn Fn(&TaskContext) -> Result<TaskOutput, TaskFailure> + Send + Sync>;

// ============================================================================
// SECTION: Task Specification
// ============================================================================

/// A deterministic task registered with the scheduler.
///
/// # Invariants
/// - `name` is unique within a scheduler.
/// - `cost_ops` and `cost_entropy` are declared deterministic costs.
#[derive(Clone)]
pub struct TaskSpec {
    /// Stable task identifier.
    pub name: String,
    /// Execution lane.
    pub lane: Lane,
    /// Priority within the lane; lower runs earlier.
    pub priority: i64,
    /// Declared ops cost.
    pub cost_ops: i64,
    /// Declared entropy cost.
    pub cost_entropy: i64,
    /// Task callable.
    pub run: TaskFn,
    /// Stable tags recorded in trace metadata.
    pub tags: Vec<String>,
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("name", &self.name)
            .field("lane", &self.lane)
            .field("priority", &self.priority)
            .field("cost_ops", &self.cost_ops)
            .field("cost_entropy", &self.cost_entropy)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Wraps a deterministic callable into a [`TaskSpec`].
#[must_use]
pub fn bind_callable(
    name: impl Into<String>,
    lane: Lane,
    priority: i64,
    cost_ops: i64,
    run: TaskFn,
) -> TaskSpec {
    TaskSpec {
        name: name.into(),
        lane,
        priority,
        cost_ops,
        cost_entropy: 0,
        run,
        tags: Vec::new(),
    }
}

// ============================================================================
// SECTION: Trace Events and Results
// ============================================================================

/// Trace event emitted for every task attempt within a tick.
///
/// # Invariants
/// - Trace order is execution order and identical across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Tick number the event belongs to.
    pub tick: u64,
    /// Task name.
    pub task: String,
    /// Execution lane.
    pub lane: Lane,
    /// Outcome status.
    pub status: TaskStatus,
    /// Declared ops cost of the task.
    pub cost_ops: i64,
    /// Declared entropy cost of the task.
    pub cost_entropy: i64,
    /// Deterministic event metadata.
    pub meta: Map<String, Value>,
}

/// Result of a single task attempt.
///
/// # Invariants
/// - `cost_ops`/`cost_entropy` are zero when the task was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Task name.
    pub name: String,
    /// Execution lane.
    pub lane: Lane,
    /// Outcome status.
    pub status: TaskStatus,
    /// Value produced by the task, when any.
    pub value: Option<Value>,
    /// Formatted failure, when the task errored.
    pub error: Option<String>,
    /// Ops cost actually deducted.
    pub cost_ops: i64,
    /// Entropy cost actually deducted.
    pub cost_entropy: i64,
}

/// Structured output of one scheduler tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    /// Tick number.
    pub tick: u64,
    /// Results keyed by task name.
    pub results: BTreeMap<String, TaskResult>,
    /// Trace events in execution order.
    pub trace: Vec<TraceEvent>,
    /// Per-lane budgets remaining after the tick.
    pub remaining: RemainingBudgets,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Scheduler contract violations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A task with the same name was already registered.
    #[error("duplicate task name: {name}")]
    DuplicateTask {
        /// Name of the rejected task.
        name: String,
    },
}

// ============================================================================
// SECTION: Scheduler
// ============================================================================

/// Deterministic, tick-based scheduler.
///
/// # Invariants
/// - Task execution order is `(lane_rank, priority, name, insertion_index)`.
/// - Identical task sets produce identical traces regardless of insertion
///   permutation.
#[derive(Default)]
pub struct DeterministicScheduler {
    /// Registered tasks in insertion order.
    tasks: Vec<TaskSpec>,
    /// Insertion index per task name; also the duplicate-name guard.
    insert_index: BTreeMap<String, usize>,
}

impl DeterministicScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a task, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::DuplicateTask`] when a task with the same
    /// name was already registered.
    pub fn add(&mut self, task: TaskSpec) -> Result<(), SchedulerError> {
        if self.insert_index.contains_key(&task.name) {
            return Err(SchedulerError::DuplicateTask {
                name: task.name.clone(),
            });
        }
        self.insert_index.insert(task.name.clone(), self.tasks.len());
        self.tasks.push(task);
        Ok(())
    }

    /// Returns the registered task count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns whether no tasks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns task indices in deterministic execution order.
    fn execution_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0 .. self.tasks.len()).collect();
        order.sort_by(|&a, &b| {
            let ta = &self.tasks[a];
            let tb = &self.tasks[b];
            (ta.lane.rank(), ta.priority, ta.name.as_str(), a)
                .cmp(&(tb.lane.rank(), tb.priority, tb.name.as_str(), b))
        });
        order
    }

    /// Executes one tick under the given per-lane budgets.
    ///
    /// Tasks run strictly sequentially in the deterministic order. A task
    /// that cannot be afforded is recorded as skipped and deducts nothing;
    /// a task failure is recorded and execution continues.
    #[must_use]
    pub fn run_tick(
        &self,
        tick: u64,
        budget_forecast: Budget,
        budget_shadow: Budget,
        context: &TaskContext,
    ) -> TickOutput {
        let mut remaining_forecast = budget_forecast;
        let mut remaining_shadow = budget_shadow;

        let mut results: BTreeMap<String, TaskResult> = BTreeMap::new();
        let mut trace: Vec<TraceEvent> = Vec::with_capacity(self.tasks.len());

        for index in self.execution_order() {
            let task = &self.tasks[index];
            let remaining = match task.lane {
                Lane::Forecast => &mut remaining_forecast,
                Lane::Shadow => &mut remaining_shadow,
            };

            if !remaining.can_afford(task.cost_ops, task.cost_entropy) {
                let mut meta = Map::new();
                meta.insert("reason".to_string(), Value::String("budget".to_string()));
                results.insert(task.name.clone(), TaskResult {
                    name: task.name.clone(),
                    lane: task.lane,
                    status: TaskStatus::SkippedBudget,
                    value: None,
                    error: None,
                    cost_ops: 0,
                    cost_entropy: 0,
                });
                trace.push(TraceEvent {
                    tick,
                    task: task.name.clone(),
                    lane: task.lane,
                    status: TaskStatus::SkippedBudget,
                    cost_ops: task.cost_ops,
                    cost_entropy: task.cost_entropy,
                    meta,
                });
                continue;
            }

            let (status, value, error) = match (task.run)(context) {
                Ok(TaskOutput::Value(value)) => (TaskStatus::Ok, Some(value), None),
                Ok(TaskOutput::NotComputable(outcome)) => {
                    let envelope = serde_json::json!({
                        "reason": outcome.reason,
                        "missing_inputs": outcome.missing_inputs,
                    });
                    (TaskStatus::NotComputable, Some(envelope), None)
                }
                Err(failure) => (TaskStatus::Error, None, Some(failure.to_string())),
            };

            // Costs apply whenever the task was attempted.
            remaining.ops -= task.cost_ops;
            remaining.entropy -= task.cost_entropy;

            let mut meta = Map::new();
            meta.insert(
                "tags".to_string(),
                Value::Array(task.tags.iter().cloned().map(Value::String).collect()),
            );
            results.insert(task.name.clone(), TaskResult {
                name: task.name.clone(),
                lane: task.lane,
                status,
                value,
                error,
                cost_ops: task.cost_ops,
                cost_entropy: task.cost_entropy,
            });
            trace.push(TraceEvent {
                tick,
                task: task.name.clone(),
                lane: task.lane,
                status,
                cost_ops: task.cost_ops,
                cost_entropy: task.cost_entropy,
                meta,
            });
        }

        TickOutput {
            tick,
            results,
            trace,
            remaining: RemainingBudgets {
                forecast: remaining_forecast,
                shadow: remaining_shadow,
            },
        }
    }
}
