// crates/abraxas-tuning/tests/portfolio.rs
// ============================================================================
// Module: Tuning Portfolio Tests
// Description: Verifies defaults, loading, and the atomic ACTIVE pointer.
// ============================================================================
//! ## Overview
//! The default caps are the documented constants, a missing ACTIVE pointer
//! yields the defaults, and pointer swaps are observed atomically.

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

use abraxas_tuning::PortfolioTuningIR;
use abraxas_tuning::UbvBudgets;
use abraxas_tuning::find_portfolio_by_hash;
use abraxas_tuning::load_active;
use abraxas_tuning::save_portfolio;
use abraxas_tuning::swap_active;
use tempfile::TempDir;

#[test]
fn defaults_match_the_documented_caps() {
    let portfolio = PortfolioTuningIR::default();
    assert_eq!(portfolio.portfolio_id, "acquisition_default");
    assert_eq!(portfolio.ubv.max_requests_per_run, 50);
    assert_eq!(portfolio.ubv.max_bytes_per_run, 10_000_000);
    assert_eq!(portfolio.ubv.batch_window, "daily");
    assert_eq!(portfolio.ubv.decodo_policy.max_requests, 1);
    assert!(portfolio.ubv.decodo_policy.manifest_only);
    assert!(!portfolio.pipeline.concurrency_enabled);
    assert_eq!(portfolio.pipeline.max_workers_fetch, 4);
    assert_eq!(portfolio.pipeline.max_workers_parse, 4);
    assert_eq!(portfolio.pipeline.max_inflight_bytes, 50_000_000);
}

#[test]
fn missing_pointer_yields_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let portfolio = load_active(dir.path()).expect("load");
    assert_eq!(portfolio, PortfolioTuningIR::default());
}

#[test]
fn swap_active_selects_the_named_portfolio() {
    let dir = TempDir::new().expect("tempdir");
    let tuned = PortfolioTuningIR {
        portfolio_id: "tuned".to_string(),
        ubv: UbvBudgets {
            max_requests_per_run: 7,
            ..UbvBudgets::default()
        },
        ..PortfolioTuningIR::default()
    };
    save_portfolio(dir.path(), "tuned", &tuned).expect("save");
    swap_active(dir.path(), "tuned.json").expect("swap");

    let active = load_active(dir.path()).expect("load");
    assert_eq!(active.portfolio_id, "tuned");
    assert_eq!(active.ubv.max_requests_per_run, 7);
    // The staging file must not survive the swap.
    assert!(!dir.path().join("ACTIVE.tmp").exists());
}

#[test]
fn dangling_pointer_falls_back_to_defaults() {
    let dir = TempDir::new().expect("tempdir");
    swap_active(dir.path(), "missing.json").expect("swap");
    let active = load_active(dir.path()).expect("load");
    assert_eq!(active, PortfolioTuningIR::default());
}

#[test]
fn portfolio_hash_is_stable_and_lookupable() {
    let dir = TempDir::new().expect("tempdir");
    let portfolio = PortfolioTuningIR::default();
    let hash = portfolio.portfolio_hash().expect("hash");
    assert_eq!(hash, portfolio.portfolio_hash().expect("hash again"));

    save_portfolio(dir.path(), "default", &portfolio).expect("save");
    let found = find_portfolio_by_hash(dir.path(), &hash).expect("find");
    assert_eq!(found, Some(dir.path().join("default.json")));

    let missing = find_portfolio_by_hash(dir.path(), "0000").expect("find");
    assert!(missing.is_none());
}

#[test]
fn partial_portfolio_documents_fill_defaults() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(
        dir.path().join("partial.json"),
        r#"{"portfolio_id":"partial","ubv":{"max_requests_per_run":2}}"#,
    )
    .expect("write");
    swap_active(dir.path(), "partial.json").expect("swap");

    let active = load_active(dir.path()).expect("load");
    assert_eq!(active.ubv.max_requests_per_run, 2);
    assert_eq!(active.ubv.max_bytes_per_run, 10_000_000);
    assert_eq!(active.pipeline.max_workers_fetch, 4);
}
