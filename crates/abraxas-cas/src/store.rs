// crates/abraxas-cas/src/store.rs
// ============================================================================
// Module: CAS Store
// Description: Write-once blob storage and the append-only URL index.
// Purpose: Deterministic content addressing for acquisition artifacts.
// Dependencies: abraxas-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `put_bytes` hashes the content, writes the blob only when the path does
//! not already exist, and optionally appends a URL index entry. `lookup_url`
//! scans the index and returns the latest matching entry. Index appends are
//! serialized through a process-local lock and written as whole lines;
//! cross-process writers are out of scope and must serialize runs themselves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use abraxas_core::CanonicalError;
use abraxas_core::canonical_json_string;
use abraxas_core::sha256_hex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CAS storage failures.
///
/// # Invariants
/// - Filesystem errors carry the offending path.
#[derive(Debug, Error)]
pub enum CasError {
    /// Filesystem operation failed.
    #[error("cas io error at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Value could not be canonically encoded.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
    /// Lookup poisoned by a panicked writer; treated as corruption.
    #[error("cas index lock poisoned")]
    IndexLockPoisoned,
}

/// Wraps an IO error with its path.
fn io_err(path: &Path, source: std::io::Error) -> CasError {
    CasError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Returns the default CAS base directory.
///
/// `ABRAXAS_ROOT` overrides the repository root the store lives under; when
/// unset the store is rooted at `data/cas` relative to the working
/// directory.
#[must_use]
pub fn default_cas_base() -> PathBuf {
    std::env::var_os("ABRAXAS_ROOT").map_or_else(
        || PathBuf::from("data/cas"),
        |root| PathBuf::from(root).join("data").join("cas"),
    )
}

// ============================================================================
// SECTION: References and Index Entries
// ============================================================================

/// Reference to a stored blob.
///
/// # Invariants
/// - `content_hash` is the lowercase hex SHA-256 of the blob bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasRef {
    /// Content hash of the blob.
    pub content_hash: String,
    /// Absolute path of the blob on disk.
    pub path: String,
    /// Blob length in bytes.
    pub bytes: u64,
    /// Subdirectory the blob was stored under.
    pub subdir: String,
    /// Filename suffix of the blob.
    pub suffix: String,
}

/// One append-only URL index entry.
///
/// # Invariants
/// - The latest entry for a URL (by file position) wins on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasIndexEntry {
    /// URL the content was acquired from.
    pub url: String,
    /// Content hash of the stored blob.
    pub content_hash: String,
    /// Absolute blob path at record time.
    pub path: String,
    /// Subdirectory the blob was stored under.
    pub subdir: String,
    /// Filename suffix of the blob.
    pub suffix: String,
    /// Acquisition timestamp, when known.
    pub recorded_at_utc: Option<String>,
    /// Acquisition metadata.
    pub meta: Map<String, Value>,
}

/// URL index metadata attached to a `put` call.
#[derive(Debug, Clone, Default)]
pub struct UrlIndexMeta {
    /// URL the content was acquired from.
    pub url: String,
    /// Acquisition timestamp, when known.
    pub recorded_at_utc: Option<String>,
    /// Acquisition metadata.
    pub meta: Map<String, Value>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Content-addressed store rooted at a base directory.
///
/// # Invariants
/// - Blobs are write-once per hash; repeat writes are no-ops.
/// - Index appends are whole lines serialized through a process-local lock.
pub struct CasStore {
    /// Base directory holding blob subdirectories.
    base_dir: PathBuf,
    /// Path of the append-only URL index.
    index_path: PathBuf,
    /// Process-local append lock for the index.
    index_lock: Mutex<()>,
}

impl CasStore {
    /// Creates a store rooted at `base_dir` with the default index path.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let index_path = base_dir.join("index.jsonl");
        Self {
            base_dir,
            index_path,
            index_lock: Mutex::new(()),
        }
    }

    /// Returns the store's base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns the blob path for a content hash.
    fn path_for_hash(&self, content_hash: &str, subdir: &str, suffix: &str) -> PathBuf {
        let shard = content_hash.get(.. 2).unwrap_or(content_hash);
        self.base_dir.join(subdir).join(shard).join(format!("{content_hash}{suffix}"))
    }

    /// Stores bytes, returning a reference; writes the blob only when absent.
    ///
    /// # Errors
    ///
    /// Returns [`CasError`] when the blob or index cannot be written.
    pub fn put_bytes(
        &self,
        data: &[u8],
        subdir: &str,
        suffix: &str,
        index: Option<UrlIndexMeta>,
    ) -> Result<CasRef, CasError> {
        let content_hash = sha256_hex(data);
        let path = self.path_for_hash(&content_hash, subdir, suffix);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        if !path.exists() {
            fs::write(&path, data).map_err(|e| io_err(&path, e))?;
        }

        let cas_ref = CasRef {
            content_hash: content_hash.clone(),
            path: path.to_string_lossy().into_owned(),
            bytes: data.len() as u64,
            subdir: subdir.to_string(),
            suffix: suffix.to_string(),
        };

        if let Some(meta) = index {
            self.append_index(&CasIndexEntry {
                url: meta.url,
                content_hash,
                path: cas_ref.path.clone(),
                subdir: subdir.to_string(),
                suffix: suffix.to_string(),
                recorded_at_utc: meta.recorded_at_utc,
                meta: meta.meta,
            })?;
        }
        Ok(cas_ref)
    }

    /// Stores UTF-8 text under the given subdirectory.
    ///
    /// # Errors
    ///
    /// Returns [`CasError`] when the blob or index cannot be written.
    pub fn put_text(
        &self,
        text: &str,
        subdir: &str,
        suffix: &str,
        index: Option<UrlIndexMeta>,
    ) -> Result<CasRef, CasError> {
        self.put_bytes(text.as_bytes(), subdir, suffix, index)
    }

    /// Stores a value as canonical JSON under the given subdirectory.
    ///
    /// # Errors
    ///
    /// Returns [`CasError`] when the value has no canonical encoding or the
    /// blob cannot be written.
    pub fn put_json<T: Serialize>(
        &self,
        value: &T,
        subdir: &str,
        suffix: &str,
        index: Option<UrlIndexMeta>,
    ) -> Result<CasRef, CasError> {
        let text = canonical_json_string(value)?;
        self.put_text(&text, subdir, suffix, index)
    }

    /// Reads a blob back by content hash.
    ///
    /// # Errors
    ///
    /// Returns [`CasError`] when the blob is missing or unreadable.
    pub fn read_bytes(
        &self,
        content_hash: &str,
        subdir: &str,
        suffix: &str,
    ) -> Result<Vec<u8>, CasError> {
        let path = self.path_for_hash(content_hash, subdir, suffix);
        fs::read(&path).map_err(|e| io_err(&path, e))
    }

    /// Returns the latest index entry for a URL, when any.
    ///
    /// Malformed index lines are skipped deterministically.
    ///
    /// # Errors
    ///
    /// Returns [`CasError`] when the index exists but cannot be read.
    pub fn lookup_url(&self, url: &str) -> Result<Option<CasIndexEntry>, CasError> {
        if !self.index_path.exists() {
            return Ok(None);
        }
        let text =
            fs::read_to_string(&self.index_path).map_err(|e| io_err(&self.index_path, e))?;
        let mut latest: Option<CasIndexEntry> = None;
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(entry) = serde_json::from_str::<CasIndexEntry>(line) else {
                continue;
            };
            if entry.url == url {
                latest = Some(entry);
            }
        }
        Ok(latest)
    }

    /// Appends a whole index line under the process-local lock.
    fn append_index(&self, entry: &CasIndexEntry) -> Result<(), CasError> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let line = canonical_json_string(entry)?;
        let _guard = self.index_lock.lock().map_err(|_| CasError::IndexLockPoisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.index_path)
            .map_err(|e| io_err(&self.index_path, e))?;
        file.write_all(format!("{line}\n").as_bytes())
            .map_err(|e| io_err(&self.index_path, e))?;
        Ok(())
    }
}
