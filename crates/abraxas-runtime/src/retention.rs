// crates/abraxas-runtime/src/retention.rs
// ============================================================================
// Module: Retention Pruner
// Description: Deterministic keep-last-N and byte-budget artifact pruning.
// Purpose: Bound disk usage without ever touching protected roots.
// Dependencies: abraxas-core, serde, serde_json, crate::{artifacts, error}
// ============================================================================

//! ## Overview
//! The pruner discovers per-tick artifact files under the known roots,
//! keeps the last N distinct ticks, optionally trims the kept set to a byte
//! budget oldest-first, and compacts the per-run manifest ledger afterwards.
//! Protected roots are a property of the pruner itself, checked on every
//! candidate deletion; `manifests/`, `policy/`, and `policy_snapshots/` can
//! never be deleted here regardless of caller input. The deletion set is a
//! pure function of the file list, file sizes, and the policy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use abraxas_core::canonical_json_bytes;
use serde::Deserialize;
use serde::Serialize;

use crate::artifacts::read_manifest;
use crate::artifacts::sort_records;
use crate::artifacts::write_manifest;
use crate::error::RuntimeError;
use crate::error::io_err;
use crate::error::json_err;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Artifact roots that hold per-tick files.
const ARTIFACT_ROOTS: [&str; 4] = ["viz", "results", "run_index", "view"];

/// Roots the pruner refuses to delete under, always enforced.
const ALWAYS_PROTECTED: [&str; 3] = ["manifests", "policy", "policy_snapshots"];

/// Retention policy document.
///
/// # Invariants
/// - Retention is opt-in; `enabled` defaults to false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Schema tag, always `RetentionPolicy.v0`.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Whether pruning is enabled at all.
    #[serde(default)]
    pub enabled: bool,
    /// Number of most recent ticks to keep per run.
    #[serde(default = "default_keep_last_ticks")]
    pub keep_last_ticks: u64,
    /// Optional byte cap across a run's kept artifact files.
    #[serde(default)]
    pub max_bytes_per_run: Option<u64>,
    /// Caller-declared protected roots, merged with the built-in set.
    #[serde(default = "default_protected_roots")]
    pub protected_roots: Vec<String>,
    /// Whether to drop ledger records for missing files after pruning.
    #[serde(default = "default_true")]
    pub compact_manifest: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            enabled: false,
            keep_last_ticks: default_keep_last_ticks(),
            max_bytes_per_run: None,
            protected_roots: default_protected_roots(),
            compact_manifest: true,
        }
    }
}

/// Default schema tag.
fn default_schema() -> String {
    "RetentionPolicy.v0".to_string()
}

/// Default kept tick count.
const fn default_keep_last_ticks() -> u64 {
    200
}

/// Default protected roots.
fn default_protected_roots() -> Vec<String> {
    vec!["manifests".to_string(), "policy".to_string()]
}

/// Serde helper returning `true`.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Report of one prune operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneReport {
    /// Run that was pruned.
    pub run_id: String,
    /// Distinct ticks remaining after the prune, ascending.
    pub kept_ticks: Vec<u64>,
    /// Deleted file paths, sorted.
    pub deleted_files: Vec<String>,
    /// Total bytes deleted.
    pub deleted_bytes: u64,
    /// Policy the prune ran under.
    pub policy: RetentionPolicy,
}

/// Per-run artifact statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Run the statistics cover.
    pub run_id: String,
    /// Distinct tick count.
    pub tick_count: u64,
    /// Artifact file count.
    pub file_count: u64,
    /// Total artifact bytes.
    pub total_bytes: u64,
    /// Oldest tick, when any.
    pub oldest_tick: Option<u64>,
    /// Newest tick, when any.
    pub newest_tick: Option<u64>,
}

// ============================================================================
// SECTION: Pruner
// ============================================================================

/// Parses the leading zero-padded tick from an artifact filename.
fn parse_tick_from_name(name: &str) -> Option<u64> {
    let head = name.split('.').next()?;
    if head.is_empty() || !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

/// Deterministic artifact pruner rooted at an artifacts directory.
///
/// # Invariants
/// - Files under a protected root are never deleted, caller policy
///   notwithstanding.
pub struct ArtifactPruner {
    /// Artifacts root directory.
    root: PathBuf,
}

impl ArtifactPruner {
    /// Creates a pruner rooted at the artifacts directory.
    #[must_use]
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: artifacts_dir.into(),
        }
    }

    /// Returns the retention policy path.
    #[must_use]
    pub fn policy_path(&self) -> PathBuf {
        self.root.join("policy").join("retention.json")
    }

    /// Ensures the policy file exists, creating the defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the policy cannot be read, written, or
    /// carries a different schema.
    pub fn ensure_policy(&self) -> Result<RetentionPolicy, RuntimeError> {
        let path = self.policy_path();
        if !path.exists() {
            self.save_policy(&RetentionPolicy::default())?;
        }
        let text = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let policy: RetentionPolicy =
            serde_json::from_str(&text).map_err(|e| json_err(&path, e))?;
        if policy.schema != "RetentionPolicy.v0" {
            return Err(RuntimeError::SchemaMismatch {
                path,
                expected: "RetentionPolicy.v0".to_string(),
                found: policy.schema,
            });
        }
        Ok(policy)
    }

    /// Saves a retention policy as canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the policy cannot be encoded or
    /// written.
    pub fn save_policy(&self, policy: &RetentionPolicy) -> Result<(), RuntimeError> {
        let path = self.policy_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let bytes = canonical_json_bytes(policy)?;
        fs::write(&path, bytes).map_err(|e| io_err(&path, e))?;
        Ok(())
    }

    /// Discovers all run identifiers that have artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when a root directory cannot be listed.
    pub fn discover_run_ids(&self) -> Result<Vec<String>, RuntimeError> {
        let mut run_ids: BTreeSet<String> = BTreeSet::new();
        for root_name in ARTIFACT_ROOTS {
            let root = self.root.join(root_name);
            if !root.exists() {
                continue;
            }
            for entry in fs::read_dir(&root).map_err(|e| io_err(&root, e))? {
                let entry = entry.map_err(|e| io_err(&root, e))?;
                if entry.path().is_dir()
                    && let Some(name) = entry.file_name().to_str()
                {
                    run_ids.insert(name.to_string());
                }
            }
        }
        Ok(run_ids.into_iter().collect())
    }

    /// Lists a run's `(tick, path)` artifact files across the known roots.
    fn tick_files(&self, run_id: &str) -> Result<Vec<(u64, PathBuf)>, RuntimeError> {
        let mut files: Vec<(u64, PathBuf)> = Vec::new();
        for root_name in ARTIFACT_ROOTS {
            let base = self.root.join(root_name).join(run_id);
            if !base.exists() {
                continue;
            }
            let mut entries: Vec<PathBuf> = fs::read_dir(&base)
                .map_err(|e| io_err(&base, e))?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            entries.sort();
            for path in entries {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if let Some(tick) = parse_tick_from_name(name) {
                    files.push((tick, path));
                }
            }
        }
        Ok(files)
    }

    /// Returns whether a path lies under any protected root.
    fn is_protected(&self, path: &Path, policy: &RetentionPolicy) -> bool {
        let protected: BTreeSet<&str> = ALWAYS_PROTECTED
            .iter()
            .copied()
            .chain(policy.protected_roots.iter().map(String::as_str))
            .collect();
        path.components().any(|component| {
            component.as_os_str().to_str().is_some_and(|name| protected.contains(name))
        })
    }

    /// Prunes a run according to the policy.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when artifact files cannot be listed or
    /// deleted, or when manifest compaction fails.
    pub fn prune_run(
        &self,
        run_id: &str,
        policy: Option<&RetentionPolicy>,
    ) -> Result<PruneReport, RuntimeError> {
        let owned_policy;
        let policy = match policy {
            Some(policy) => policy,
            None => {
                owned_policy = self.ensure_policy()?;
                &owned_policy
            }
        };

        if !policy.enabled {
            return Ok(PruneReport {
                run_id: run_id.to_string(),
                kept_ticks: Vec::new(),
                deleted_files: Vec::new(),
                deleted_bytes: 0,
                policy: policy.clone(),
            });
        }

        let files = self.tick_files(run_id)?;
        let ticks: BTreeSet<u64> = files.iter().map(|(tick, _)| *tick).collect();
        if ticks.is_empty() {
            return Ok(PruneReport {
                run_id: run_id.to_string(),
                kept_ticks: Vec::new(),
                deleted_files: Vec::new(),
                deleted_bytes: 0,
                policy: policy.clone(),
            });
        }

        let keep_count = usize::try_from(policy.keep_last_ticks).unwrap_or(usize::MAX);
        let keep_set: BTreeSet<u64> = if keep_count == 0 {
            BTreeSet::new()
        } else {
            ticks.iter().rev().take(keep_count).copied().collect()
        };

        let mut to_delete: BTreeSet<PathBuf> = files
            .iter()
            .filter(|(tick, _)| !keep_set.contains(tick))
            .map(|(_, path)| path.clone())
            .collect();

        // Byte-budget pruning within the kept set, oldest kept files first.
        if let Some(max_bytes) = policy.max_bytes_per_run {
            let mut kept_files: Vec<(u64, PathBuf)> = files
                .iter()
                .filter(|(tick, _)| keep_set.contains(tick))
                .cloned()
                .collect();
            kept_files.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

            let mut total: u64 = 0;
            for (_, path) in &kept_files {
                total += fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            }
            for (_, path) in &kept_files {
                if total <= max_bytes {
                    break;
                }
                if self.is_protected(path, policy) {
                    continue;
                }
                let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                to_delete.insert(path.clone());
                total = total.saturating_sub(size);
            }
        }

        let mut deleted_files: Vec<String> = Vec::new();
        let mut deleted_bytes: u64 = 0;
        for path in &to_delete {
            if self.is_protected(path, policy) {
                continue;
            }
            if path.is_file() {
                deleted_bytes += fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                fs::remove_file(path).map_err(|e| io_err(path, e))?;
                deleted_files.push(path.to_string_lossy().into_owned());
            }
        }
        deleted_files.sort();
        tracing::info!(
            run_id,
            deleted = deleted_files.len(),
            deleted_bytes,
            "retention prune complete"
        );

        if policy.compact_manifest {
            self.compact_manifest(run_id)?;
        }

        let remaining: BTreeSet<u64> =
            self.tick_files(run_id)?.iter().map(|(tick, _)| *tick).collect();

        Ok(PruneReport {
            run_id: run_id.to_string(),
            kept_ticks: remaining.into_iter().collect(),
            deleted_files,
            deleted_bytes,
            policy: policy.clone(),
        })
    }

    /// Prunes every discovered run.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when discovery or any per-run prune fails.
    pub fn prune_all(
        &self,
        policy: Option<&RetentionPolicy>,
    ) -> Result<Vec<PruneReport>, RuntimeError> {
        let mut reports = Vec::new();
        for run_id in self.discover_run_ids()? {
            reports.push(self.prune_run(&run_id, policy)?);
        }
        Ok(reports)
    }

    /// Drops ledger records whose file no longer exists and rewrites the
    /// ledger in stable order.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when the ledger cannot be read or written.
    pub fn compact_manifest(&self, run_id: &str) -> Result<(), RuntimeError> {
        let path = self.root.join("manifests").join(format!("{run_id}.manifest.json"));
        if !path.exists() {
            return Ok(());
        }
        let mut ledger = read_manifest(&path)?;
        if ledger.schema != "Manifest.v0" {
            return Ok(());
        }
        ledger.records.retain(|record| self.root.join(&record.path).exists());
        sort_records(&mut ledger.records);
        write_manifest(&path, &ledger)
    }

    /// Computes artifact statistics for a run.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] when artifact files cannot be listed.
    pub fn run_stats(&self, run_id: &str) -> Result<RunStats, RuntimeError> {
        let files = self.tick_files(run_id)?;
        let ticks: BTreeSet<u64> = files.iter().map(|(tick, _)| *tick).collect();
        let mut total_bytes: u64 = 0;
        for (_, path) in &files {
            total_bytes += fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        }
        Ok(RunStats {
            run_id: run_id.to_string(),
            tick_count: ticks.len() as u64,
            file_count: files.len() as u64,
            total_bytes,
            oldest_tick: ticks.iter().next().copied(),
            newest_tick: ticks.iter().next_back().copied(),
        })
    }
}
