// crates/abraxas-runtime/src/resolve.rs
// ============================================================================
// Module: Result Resolution
// Description: Loader merging TrendPack events with their task results.
// Purpose: Follow `meta.result_ref` pointers without re-reading packs.
// Dependencies: serde, serde_json, crate::error
// ============================================================================

//! ## Overview
//! A UI (or the ViewPack builder) can take a TrendPack event and resolve its
//! `ResultRef.v0` into the full task result. The resolver caches ResultsPack
//! indexes per path for the lifetime of one resolver value, so resolving a
//! whole timeline reads each referenced pack once. Missing or malformed
//! references resolve to `None` rather than failing the batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::RuntimeError;
use crate::error::io_err;
use crate::error::json_err;

// ============================================================================
// SECTION: Loaders
// ============================================================================

/// Reads and parses a JSON artifact.
fn read_json(path: &Path) -> Result<Value, RuntimeError> {
    if !path.exists() {
        return Err(RuntimeError::MissingArtifact {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&text).map_err(|e| json_err(path, e))
}

/// Loads and schema-checks a `TrendPack.v0`.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the pack is missing, malformed, or tagged
/// with a different version.
pub fn load_trendpack(path: &Path) -> Result<Value, RuntimeError> {
    let pack = read_json(path)?;
    let version = pack.get("version").and_then(Value::as_str).unwrap_or_default();
    if version != "TrendPack.v0" {
        return Err(RuntimeError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: "TrendPack.v0".to_string(),
            found: version.to_string(),
        });
    }
    Ok(pack)
}

/// Loads and schema-checks a `ResultsPack.v0`.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the pack is missing, malformed, or tagged
/// with a different schema.
pub fn load_resultspack(path: &Path) -> Result<Value, RuntimeError> {
    let pack = read_json(path)?;
    let schema = pack.get("schema").and_then(Value::as_str).unwrap_or_default();
    if schema != "ResultsPack.v0" {
        return Err(RuntimeError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: "ResultsPack.v0".to_string(),
            found: schema.to_string(),
        });
    }
    Ok(pack)
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// One resolved timeline row: the event, its reference, and the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEvent {
    /// Original timeline event.
    pub event: Value,
    /// The `ResultRef.v0` the event carried, when any.
    #[serde(rename = "ref")]
    pub result_ref: Option<Value>,
    /// Resolved task result, when the reference resolved.
    pub result: Option<Value>,
}

/// Resolver with a per-instance ResultsPack index cache.
pub struct Resolver {
    /// Artifacts root used to resolve relative reference paths.
    artifacts_dir: PathBuf,
    /// Cached task-name indexes keyed by pack path.
    cache: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Resolver {
    /// Creates a resolver rooted at the artifacts directory.
    #[must_use]
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
            cache: BTreeMap::new(),
        }
    }

    /// Returns the task index of a ResultsPack, reading it at most once.
    fn pack_index(&mut self, rel_path: &str) -> Option<&BTreeMap<String, Value>> {
        if !self.cache.contains_key(rel_path) {
            let path = self.artifacts_dir.join(rel_path);
            let pack = load_resultspack(&path).ok()?;
            let mut index: BTreeMap<String, Value> = BTreeMap::new();
            let empty = Vec::new();
            for item in pack.get("items").and_then(Value::as_array).unwrap_or(&empty) {
                if let (Some(task), Some(result)) =
                    (item.get("task").and_then(Value::as_str), item.get("result"))
                {
                    index.insert(task.to_string(), result.clone());
                }
            }
            self.cache.insert(rel_path.to_string(), index);
        }
        self.cache.get(rel_path)
    }

    /// Resolves one timeline event's result reference.
    pub fn resolve_event(&mut self, event: &Value) -> ResolvedEvent {
        let reference = event
            .get("meta")
            .and_then(|meta| meta.get("result_ref"))
            .filter(|r| {
                r.get("schema").and_then(Value::as_str) == Some("ResultRef.v0")
            })
            .cloned();

        let Some(reference) = reference else {
            return ResolvedEvent {
                event: event.clone(),
                result_ref: None,
                result: None,
            };
        };

        let pack_path = reference.get("results_pack").and_then(Value::as_str);
        let task = reference.get("task").and_then(Value::as_str);
        let result = match (pack_path, task) {
            (Some(pack_path), Some(task)) => {
                self.pack_index(pack_path).and_then(|index| index.get(task).cloned())
            }
            _ => None,
        };

        ResolvedEvent {
            event: event.clone(),
            result_ref: Some(reference),
            result,
        }
    }

    /// Loads a TrendPack and resolves its first `limit` events.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the TrendPack itself cannot be loaded;
    /// individual unresolvable references yield `result: None`.
    pub fn resolve_trendpack_events(
        &mut self,
        trendpack_rel_path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ResolvedEvent>, RuntimeError> {
        let path = self.artifacts_dir.join(trendpack_rel_path);
        let pack = load_trendpack(&path)?;
        let empty = Vec::new();
        let events = pack.get("timeline").and_then(Value::as_array).unwrap_or(&empty);
        let take = limit.unwrap_or(events.len());
        Ok(events.iter().take(take).map(|event| self.resolve_event(event)).collect())
    }
}
