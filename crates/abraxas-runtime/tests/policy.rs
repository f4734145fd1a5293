// crates/abraxas-runtime/tests/policy.rs
// ============================================================================
// Module: Policy Snapshot Tests
// Description: Verifies content addressing and drift verdicts.
// ============================================================================
//! ## Overview
//! Snapshots are content-addressed: identical inputs return identical
//! `(path, hash)` pairs and leave exactly one file; later edits to the
//! policy file never mutate an existing snapshot. Mutable-file references
//! report drift without failing.

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

use abraxas_runtime::ensure_policy_snapshot;
use abraxas_runtime::load_policy_snapshot;
use abraxas_runtime::policy_ref_for_file;
use abraxas_runtime::policy_ref_from_snapshot;
use abraxas_runtime::verify_policy_ref;
use abraxas_runtime::verify_policy_snapshot;
use tempfile::TempDir;

#[test]
fn snapshot_of_missing_policy_marks_absence_explicitly() {
    let dir = TempDir::new().expect("tempdir");
    let policy_path = dir.path().join("policy/retention.json");

    let (rel, sha) =
        ensure_policy_snapshot(dir.path(), "r1", "retention", &policy_path).expect("snapshot");
    assert!(rel.starts_with("policy_snapshots/r1/retention."));
    assert!(rel.ends_with(".policysnapshot.json"));
    assert!(rel.contains(&sha));

    let snapshot = load_policy_snapshot(&rel, Some(dir.path())).expect("load");
    assert!(!snapshot.present);
    assert!(snapshot.policy_obj.is_null());
}

#[test]
fn snapshot_is_content_addressed_and_idempotent() {
    let dir = TempDir::new().expect("tempdir");
    let policy_path = dir.path().join("policy/retention.json");
    std::fs::create_dir_all(policy_path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&policy_path, r#"{"enabled": true, "keep_last_ticks": 3}"#).expect("write");

    let first =
        ensure_policy_snapshot(dir.path(), "r1", "retention", &policy_path).expect("snapshot");
    let second =
        ensure_policy_snapshot(dir.path(), "r1", "retention", &policy_path).expect("snapshot");
    assert_eq!(first, second);

    // Exactly one snapshot file exists for the content.
    let snap_dir = dir.path().join("policy_snapshots/r1");
    let entries: Vec<_> = std::fs::read_dir(&snap_dir).expect("list").collect();
    assert_eq!(entries.len(), 1);

    let verify = verify_policy_snapshot(&first.0, &first.1, Some(dir.path()));
    assert!(verify.valid, "{}", verify.reason);
}

#[test]
fn editing_the_policy_never_mutates_an_existing_snapshot() {
    let dir = TempDir::new().expect("tempdir");
    let policy_path = dir.path().join("policy/retention.json");
    std::fs::create_dir_all(policy_path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&policy_path, r#"{"enabled": false}"#).expect("write");

    let original =
        ensure_policy_snapshot(dir.path(), "r1", "retention", &policy_path).expect("snapshot");

    std::fs::write(&policy_path, r#"{"enabled": true}"#).expect("rewrite");
    let updated =
        ensure_policy_snapshot(dir.path(), "r1", "retention", &policy_path).expect("snapshot");

    assert_ne!(original, updated, "changed content must address a new snapshot");
    let verify = verify_policy_snapshot(&original.0, &original.1, Some(dir.path()));
    assert!(verify.valid, "original snapshot must remain intact: {}", verify.reason);
}

#[test]
fn policy_ref_points_at_its_snapshot() {
    let reference = policy_ref_from_snapshot("retention", "policy_snapshots/r1/x.json", "abc");
    assert_eq!(reference.schema, "PolicyRef.v0");
    assert_eq!(reference.policy, "retention");
    assert_eq!(reference.snapshot_sha256, "abc");
}

#[test]
fn mutable_file_ref_reports_drift_after_edit() {
    let dir = TempDir::new().expect("tempdir");
    let policy_path = dir.path().join("policy/emission.json");
    std::fs::create_dir_all(policy_path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&policy_path, r#"{"cap": 1}"#).expect("write");

    let reference = policy_ref_for_file("emission", &policy_path).expect("ref");
    let clean = verify_policy_ref(&reference, None);
    assert!(clean.valid);
    assert_eq!(clean.drift, Some(false));

    std::fs::write(&policy_path, r#"{"cap": 2}"#).expect("rewrite");
    let drifted = verify_policy_ref(&reference, None);
    assert!(drifted.valid);
    assert_eq!(drifted.drift, Some(true));
    assert_ne!(drifted.current_sha256, drifted.ref_sha256);
}

#[test]
fn missing_file_ref_verifies_without_drift() {
    let dir = TempDir::new().expect("tempdir");
    let policy_path = dir.path().join("policy/absent.json");
    let reference = policy_ref_for_file("absent", &policy_path).expect("ref");
    let verdict = verify_policy_ref(&reference, None);
    assert!(verdict.valid);
    assert_eq!(verdict.drift, Some(false));
}
