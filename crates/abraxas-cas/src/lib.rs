// crates/abraxas-cas/src/lib.rs
// ============================================================================
// Module: Content-Addressed Store
// Description: Immutable blob storage keyed by SHA-256 content hash.
// Purpose: Stage acquired bytes once, deterministically, with a URL index.
// Dependencies: abraxas-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The CAS stores byte blobs at `base/<subdir>/<hash[0..2]>/<hash><suffix>`
//! and is write-once per hash: repeat writes of identical content are no-ops.
//! An append-only JSONL index maps URLs to content hashes; lookups scan the
//! whole index and the latest entry for a URL wins, which keeps reads
//! deterministic under append-only writes. The scan is O(n) in the index
//! size; no compaction strategy is implemented.
//!
//! Entries are created by acquisition and owned by the store. Nothing here
//! mutates or deletes a blob.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod store;

pub use store::CasError;
pub use store::CasIndexEntry;
pub use store::CasRef;
pub use store::CasStore;
pub use store::UrlIndexMeta;
pub use store::default_cas_base;
