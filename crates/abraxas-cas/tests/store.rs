// crates/abraxas-cas/tests/store.rs
// ============================================================================
// Module: CAS Store Tests
// Description: Verifies write-once blobs and latest-wins URL index reads.
// ============================================================================
//! ## Overview
//! Repeated puts of identical content must be idempotent, and the URL index
//! must resolve to the most recently appended entry for a URL.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::path::Path;

use abraxas_cas::CasStore;
use abraxas_cas::UrlIndexMeta;
use serde_json::Map;
use serde_json::json;
use tempfile::TempDir;

/// Creates a store rooted in a fresh temporary directory.
fn store() -> (TempDir, CasStore) {
    let dir = TempDir::new().expect("tempdir");
    let cas = CasStore::new(dir.path().join("cas"));
    (dir, cas)
}

#[test]
fn put_bytes_is_idempotent_and_sharded() {
    let (_dir, cas) = store();
    let a = cas.put_bytes(b"payload", "raw", ".bin", None).expect("first put");
    let b = cas.put_bytes(b"payload", "raw", ".bin", None).expect("second put");

    assert_eq!(a, b);
    let path = Path::new(&a.path);
    assert!(path.exists());
    let shard = path.parent().expect("shard dir");
    assert_eq!(
        shard.file_name().and_then(|n| n.to_str()),
        a.content_hash.get(.. 2),
        "blobs shard by the first two hash characters"
    );
    // Exactly one file for the content.
    let entries: Vec<_> = std::fs::read_dir(shard).expect("read shard").collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn read_bytes_round_trips_content() {
    let (_dir, cas) = store();
    let r = cas.put_bytes(b"abc123", "raw", ".bin", None).expect("put");
    let back = cas.read_bytes(&r.content_hash, "raw", ".bin").expect("read");
    assert_eq!(back, b"abc123");
}

#[test]
fn lookup_url_returns_latest_entry() {
    let (_dir, cas) = store();
    let url = "https://example.com/sitemap.xml";
    cas.put_bytes(b"first", "raw", ".bin", Some(UrlIndexMeta {
        url: url.to_string(),
        recorded_at_utc: Some("2025-01-01T00:00:00Z".to_string()),
        meta: Map::new(),
    }))
    .expect("put first");
    let second = cas
        .put_bytes(b"second", "raw", ".bin", Some(UrlIndexMeta {
            url: url.to_string(),
            recorded_at_utc: Some("2025-01-02T00:00:00Z".to_string()),
            meta: Map::new(),
        }))
        .expect("put second");

    let entry = cas.lookup_url(url).expect("lookup").expect("entry");
    assert_eq!(entry.content_hash, second.content_hash);
    assert_eq!(entry.recorded_at_utc.as_deref(), Some("2025-01-02T00:00:00Z"));
}

#[test]
fn lookup_url_misses_unknown_urls() {
    let (_dir, cas) = store();
    assert!(cas.lookup_url("https://example.com/absent").expect("lookup").is_none());
}

#[test]
fn put_json_uses_canonical_encoding() {
    let (_dir, cas) = store();
    let a = cas.put_json(&json!({"b": 2, "a": 1}), "json", ".json", None).expect("put a");
    let b = cas.put_json(&json!({"a": 1, "b": 2}), "json", ".json", None).expect("put b");
    // Key order must not change the stored content hash.
    assert_eq!(a.content_hash, b.content_hash);

    let bytes = cas.read_bytes(&a.content_hash, "json", ".json").expect("read");
    assert_eq!(bytes, br#"{"a":1,"b":2}"#);
}

#[test]
fn default_cas_base_ends_with_the_conventional_layout() {
    let base = abraxas_cas::default_cas_base();
    assert!(base.ends_with("data/cas"));
}

#[test]
fn malformed_index_lines_are_skipped() {
    let (_dir, cas) = store();
    let url = "https://example.com/a";
    cas.put_bytes(b"content", "raw", ".bin", Some(UrlIndexMeta {
        url: url.to_string(),
        recorded_at_utc: None,
        meta: Map::new(),
    }))
    .expect("put");

    // Corrupt the index with a garbage line; lookups must still resolve.
    let index = cas.base_dir().join("index.jsonl");
    let mut text = std::fs::read_to_string(&index).expect("read index");
    text.push_str("not json\n");
    std::fs::write(&index, text).expect("write index");

    let entry = cas.lookup_url(url).expect("lookup").expect("entry");
    assert_eq!(entry.url, url);
}
