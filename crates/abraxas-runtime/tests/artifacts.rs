// crates/abraxas-runtime/tests/artifacts.rs
// ============================================================================
// Module: Artifact Writer Tests
// Description: Verifies canonical writes and the sorted manifest ledger.
// ============================================================================
//! ## Overview
//! Written bytes must hash to the recorded digest, and the manifest ledger
//! must be a pure function of its record set: sorted by
//! `(tick, kind, schema, path)` regardless of append order.

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

use abraxas_core::sha256_hex;
use abraxas_runtime::ArtifactSpec;
use abraxas_runtime::ArtifactWriter;
use abraxas_runtime::read_manifest;
use serde_json::json;
use tempfile::TempDir;

/// Builds a spec for a per-tick artifact.
fn spec(run_id: &str, tick: u64, kind: &str, schema: &str, rel_path: &str) -> ArtifactSpec {
    ArtifactSpec {
        run_id: run_id.to_string(),
        tick,
        kind: kind.to_string(),
        schema: schema.to_string(),
        rel_path: rel_path.to_string(),
        extra: None,
    }
}

#[test]
fn write_json_records_hash_of_bytes_on_disk() {
    let dir = TempDir::new().expect("tempdir");
    let writer = ArtifactWriter::new(dir.path());

    let record = writer
        .write_json(
            &spec("r1", 0, "trendpack", "TrendPack.v0", "viz/r1/000000.trendpack.json"),
            &json!({"b": 2, "a": 1}),
        )
        .expect("write");

    let bytes = std::fs::read(&record.path).expect("read back");
    assert_eq!(bytes, br#"{"a":1,"b":2}"#);
    assert_eq!(record.sha256, sha256_hex(&bytes));
    assert_eq!(record.bytes, bytes.len() as u64);
}

#[test]
fn manifest_ledger_sorts_records_on_every_append() {
    let dir = TempDir::new().expect("tempdir");
    let writer = ArtifactWriter::new(dir.path());

    // Append out of order: tick 1 before tick 0, kinds unsorted.
    writer
        .write_json(
            &spec("r1", 1, "trendpack", "TrendPack.v0", "viz/r1/000001.trendpack.json"),
            &json!({"t": 1}),
        )
        .expect("write");
    writer
        .write_json(
            &spec("r1", 0, "runindex", "RunIndex.v0", "run_index/r1/000000.runindex.json"),
            &json!({"t": 0}),
        )
        .expect("write");
    writer
        .write_json(
            &spec("r1", 0, "resultspack", "ResultsPack.v0", "results/r1/000000.resultspack.json"),
            &json!({"t": 0}),
        )
        .expect("write");

    let ledger = read_manifest(&writer.manifest_path("r1")).expect("ledger");
    assert_eq!(ledger.schema, "Manifest.v0");
    assert_eq!(ledger.run_id, "r1");
    let ordered: Vec<(u64, &str)> =
        ledger.records.iter().map(|r| (r.tick, r.kind.as_str())).collect();
    assert_eq!(ordered, vec![(0, "resultspack"), (0, "runindex"), (1, "trendpack")]);
}

#[test]
fn ledger_content_is_a_pure_function_of_its_records() {
    let first_dir = TempDir::new().expect("tempdir");
    let second_dir = TempDir::new().expect("tempdir");
    let first = ArtifactWriter::new(first_dir.path());
    let second = ArtifactWriter::new(second_dir.path());

    // Same record set, different append orders.
    for (writer, order) in [(&first, [0u64, 1]), (&second, [1u64, 0])] {
        for tick in order {
            writer
                .write_json(
                    &spec(
                        "r1",
                        tick,
                        "trendpack",
                        "TrendPack.v0",
                        &format!("viz/r1/{tick:06}.trendpack.json"),
                    ),
                    &json!({ "tick": tick }),
                )
                .expect("write");
        }
    }

    let a = std::fs::read(first.manifest_path("r1")).expect("read a");
    let b = std::fs::read(second.manifest_path("r1")).expect("read b");
    assert_eq!(a, b);
}

#[test]
fn extra_metadata_round_trips_through_the_ledger() {
    let dir = TempDir::new().expect("tempdir");
    let writer = ArtifactWriter::new(dir.path());
    let mut with_extra =
        spec("r1", 0, "trendpack", "TrendPack.v0", "viz/r1/000000.trendpack.json");
    with_extra.extra = json!({"mode": "sandbox"}).as_object().cloned();

    writer.write_json(&with_extra, &json!({})).expect("write");
    let ledger = read_manifest(&writer.manifest_path("r1")).expect("ledger");
    assert_eq!(ledger.records[0].extra, Some(json!({"mode": "sandbox"})));
}
