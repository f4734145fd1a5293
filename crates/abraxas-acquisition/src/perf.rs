// crates/abraxas-acquisition/src/perf.rs
// ============================================================================
// Module: Perf Ledger
// Description: Append-only JSONL ledger for acquisition telemetry.
// Purpose: Record fetch and stage events without touching artifact content.
// Dependencies: abraxas-core, serde, thiserror
// ============================================================================

//! ## Overview
//! The ledger appends one canonical JSON line per event. Ledger content is
//! telemetry only; nothing downstream hashes it, so wall-clock fields are
//! allowed here and only here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use abraxas_core::canonical_json_string;
use serde::Serialize;

use crate::error::AcquisitionError;

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// Append-only JSONL perf ledger.
///
/// # Invariants
/// - Appends are whole lines serialized through a process-local lock.
pub struct PerfLedger {
    /// Ledger file path.
    path: PathBuf,
    /// Process-local append lock.
    lock: Mutex<()>,
}

impl PerfLedger {
    /// Creates a ledger writing to the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Appends one event as a canonical JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError`] when the event cannot be encoded or the
    /// ledger cannot be written.
    pub fn record<T: Serialize>(&self, event: &T) -> Result<(), AcquisitionError> {
        let line = canonical_json_string(event)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| AcquisitionError::Perf {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let guard = self.lock.lock();
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).map_err(
            |source| AcquisitionError::Perf {
                path: self.path.clone(),
                source,
            },
        )?;
        file.write_all(format!("{line}\n").as_bytes()).map_err(|source| {
            AcquisitionError::Perf {
                path: self.path.clone(),
                source,
            }
        })?;
        drop(guard);
        Ok(())
    }
}
