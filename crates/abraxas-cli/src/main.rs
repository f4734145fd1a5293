// crates/abraxas-cli/src/main.rs
// ============================================================================
// Module: Abraxas CLI Entry Point
// Description: Command dispatcher for seal, gate, validate, and prune.
// Purpose: Thin exit-code surface over the runtime and validation crates.
// Dependencies: abraxas-core, abraxas-runtime, abraxas-validate, clap,
// serde_json, tracing-subscriber
// ============================================================================

//! ## Overview
//! Four commands, one convention: exit `0` on success, `1` on any failure.
//! `seal` runs one deterministic tick, validates it, runs the dozen-run
//! gate, and writes the seal report. `gate` runs the invariance gate alone
//! and persists the stability verdict. `validate` checks an existing run's
//! artifacts, printing JSON with `--json`. `prune` applies the retention
//! policy. All argument parsing stays in this crate; the libraries never
//! see it.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "The CLI is the human-facing output surface."
)]

// ============================================================================
// SECTION: Modules
// ============================================================================

mod seal_pipeline;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use abraxas_runtime::ArtifactPruner;
use abraxas_runtime::TickParams;
use abraxas_runtime::dozen_run_tick_invariance_gate;
use abraxas_runtime::run_pipeline_tick;
use abraxas_runtime::write_run_stability;
use abraxas_runtime::write_stability_ref;
use abraxas_validate::SealInputs;
use abraxas_validate::validate_run;
use abraxas_validate::write_seal_report;
use clap::Parser;
use clap::Subcommand;
use serde_json::json;

use crate::seal_pipeline::seal_bindings;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Deterministic observational pipeline gates.
#[derive(Debug, Parser)]
#[command(name = "abraxas", version, about = "Abraxas release and retention gates")]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run the release seal: one tick, validation, dozen-run gate, report.
    Seal {
        /// Run identifier for the seal artifacts.
        #[arg(long, default_value = "seal")]
        run_id: String,
        /// Tick number for the seal tick.
        #[arg(long, default_value_t = 0)]
        tick: u64,
        /// Number of gate runs.
        #[arg(long, default_value_t = 12)]
        runs: u64,
        /// Release version label; defaults to the crate version.
        #[arg(long)]
        version: Option<String>,
    },
    /// Run the dozen-run invariance gate and persist the verdict.
    Gate {
        /// Root artifacts directory for the gate runs.
        #[arg(long)]
        artifacts_dir: PathBuf,
        /// Run identifier for the stability record.
        #[arg(long, default_value = "dozen_gate")]
        run_id: String,
        /// Number of gate runs.
        #[arg(long, default_value_t = 12)]
        runs: u64,
    },
    /// Validate an emitted run's artifacts against their schemas.
    Validate {
        /// Root artifacts directory.
        #[arg(long)]
        artifacts_dir: PathBuf,
        /// Run identifier to validate.
        #[arg(long)]
        run_id: String,
        /// Specific tick to validate; validates every tick when absent.
        #[arg(long)]
        tick: Option<u64>,
        /// Emit the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Apply the retention policy to one run or every discovered run.
    Prune {
        /// Root artifacts directory.
        #[arg(long)]
        artifacts_dir: PathBuf,
        /// Run identifier to prune; prunes every run when absent.
        #[arg(long)]
        run_id: Option<String>,
        /// Emit the reports as JSON.
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Removes and recreates a directory.
fn clear_dir(path: &std::path::Path) -> std::io::Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)
}

/// Runs the release seal flow.
fn run_seal(run_id: &str, tick: u64, runs: u64, version: Option<String>) -> ExitCode {
    let version = version.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let seal_dir = PathBuf::from("./artifacts_seal");
    let gate_dir = PathBuf::from("./artifacts_gate");

    println!("ABRAXAS SEAL RELEASE v{version}");

    if let Err(error) = clear_dir(&seal_dir).and_then(|()| clear_dir(&gate_dir)) {
        eprintln!("failed to prepare seal directories: {error}");
        return ExitCode::FAILURE;
    }

    let bindings = seal_bindings();

    println!("[1/4] running seal tick into {}", seal_dir.display());
    let outcome = match run_pipeline_tick(&TickParams {
        tick,
        run_id,
        mode: "sandbox",
        context: &json!({"x": 1}),
        artifacts_dir: &seal_dir,
        bindings: &bindings,
    }) {
        Ok(outcome) => outcome,
        Err(error) => {
            eprintln!("seal tick failed: {error}");
            return ExitCode::FAILURE;
        }
    };
    println!("  TrendPack: {}", outcome.artifacts.trendpack);
    println!("  ResultsPack: {}", outcome.artifacts.results_pack);
    println!("  RunHeader: {}", outcome.artifacts.run_header);

    println!("[2/4] validating artifacts");
    let validation = validate_run(&seal_dir, run_id, Some(tick));
    if validation.ok {
        println!("  VALIDATION: PASS ({:?})", validation.validated_ticks);
    } else {
        println!("  VALIDATION: FAIL");
        for failure in &validation.failures {
            println!("    - {} at {}", failure.artifact_kind, failure.path);
            for error in &failure.errors {
                println!("        {error}");
            }
        }
    }

    println!("[3/4] running dozen-run gate ({runs} runs) into {}", gate_dir.display());
    let gate = match dozen_run_tick_invariance_gate(&gate_dir, runs, |_i, artifacts_dir| {
        run_pipeline_tick(&TickParams {
            tick,
            run_id,
            mode: "sandbox",
            context: &json!({"x": 1}),
            artifacts_dir,
            bindings: &bindings,
        })
    }) {
        Ok(gate) => gate,
        Err(error) => {
            eprintln!("gate execution failed: {error}");
            return ExitCode::FAILURE;
        }
    };
    if gate.ok {
        println!("  GATE: PASS");
    } else {
        println!("  GATE: FAIL (first mismatch run: {:?})", gate.first_mismatch_run);
    }

    println!("[4/4] writing SealReport.v0");
    let report = write_seal_report(&seal_dir, run_id, &SealInputs {
        version: &version,
        version_pack: json!({"schema": "AbraxasVersionPack.v0", "abraxas": version}),
        seal_tick_artifacts: json!({
            "trendpack": outcome.artifacts.trendpack,
            "trendpack_sha256": outcome.artifacts.trendpack_sha256,
            "results_pack": outcome.artifacts.results_pack,
            "results_pack_sha256": outcome.artifacts.results_pack_sha256,
            "runindex": outcome.artifacts.runindex,
            "runindex_sha256": outcome.artifacts.runindex_sha256,
            "viewpack": outcome.artifacts.viewpack,
            "viewpack_sha256": outcome.artifacts.viewpack_sha256,
            "run_header": outcome.artifacts.run_header,
            "run_header_sha256": outcome.artifacts.run_header_sha256,
        }),
        validation_result: &validation,
        dozen_gate_result: &gate,
    });
    match report {
        Ok((path, sha)) => println!("  report: {} ({sha})", path.display()),
        Err(error) => {
            eprintln!("seal report write failed: {error}");
            return ExitCode::FAILURE;
        }
    }

    if validation.ok && gate.ok {
        println!("SEAL RELEASE: PASS");
        ExitCode::SUCCESS
    } else {
        println!("SEAL RELEASE: FAIL");
        ExitCode::FAILURE
    }
}

/// Runs the standalone invariance gate flow.
fn run_gate(artifacts_dir: &std::path::Path, run_id: &str, runs: u64) -> ExitCode {
    let bindings = seal_bindings();
    let gate = match dozen_run_tick_invariance_gate(artifacts_dir, runs, |_i, run_dir| {
        run_pipeline_tick(&TickParams {
            tick: 0,
            run_id,
            mode: "sandbox",
            context: &json!({"x": 1}),
            artifacts_dir: run_dir,
            bindings: &bindings,
        })
    }) {
        Ok(gate) => gate,
        Err(error) => {
            eprintln!("gate execution failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    let note = if gate.ok { "dozen-run gate pass" } else { "dozen-run gate failure" };
    let persisted = write_run_stability(artifacts_dir, run_id, &gate, Some(note)).and_then(
        |(_, stability_sha)| write_stability_ref(artifacts_dir, run_id, &stability_sha),
    );
    if let Err(error) = persisted {
        eprintln!("failed to persist stability record: {error}");
        return ExitCode::FAILURE;
    }

    if gate.ok {
        println!("DOZEN-RUN GATE: PASS");
        println!("TrendPack sha256: {:?}", gate.expected_trendpack_sha256);
        println!("RunHeader sha256: {:?}", gate.expected_runheader_sha256);
        println!("All {} runs produced identical artifacts.", gate.trendpack_sha256s.len());
        ExitCode::SUCCESS
    } else {
        println!("DOZEN-RUN GATE: FAIL");
        println!("first_mismatch_run: {:?}", gate.first_mismatch_run);
        if let Some(divergence) = &gate.divergence {
            match serde_json::to_string(divergence) {
                Ok(text) => println!("divergence: {text}"),
                Err(_) => println!("divergence: <unencodable>"),
            }
        }
        ExitCode::FAILURE
    }
}

/// Runs the validation flow.
fn run_validate(
    artifacts_dir: &std::path::Path,
    run_id: &str,
    tick: Option<u64>,
    as_json: bool,
) -> ExitCode {
    let result = validate_run(artifacts_dir, run_id, tick);

    if as_json {
        match serde_json::to_string(&result) {
            Ok(text) => println!("{text}"),
            Err(error) => {
                eprintln!("failed to encode validation result: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else if result.ok {
        println!("VALIDATION: PASS");
        println!("Validated ticks: {:?}", result.validated_ticks);
    } else {
        println!("VALIDATION: FAIL");
        println!("Validated ticks: {:?}", result.validated_ticks);
        for failure in &result.failures {
            println!(
                "  - tick={:?}, kind={}, path={}",
                failure.tick, failure.artifact_kind, failure.path
            );
            for error in &failure.errors {
                println!("      {error}");
            }
        }
    }

    if result.ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

/// Runs the retention prune flow.
fn run_prune(artifacts_dir: &std::path::Path, run_id: Option<&str>, as_json: bool) -> ExitCode {
    let pruner = ArtifactPruner::new(artifacts_dir);
    let reports = match run_id {
        Some(run_id) => pruner.prune_run(run_id, None).map(|report| vec![report]),
        None => pruner.prune_all(None),
    };
    let reports = match reports {
        Ok(reports) => reports,
        Err(error) => {
            eprintln!("prune failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    if as_json {
        match serde_json::to_string(&reports) {
            Ok(text) => println!("{text}"),
            Err(error) => {
                eprintln!("failed to encode prune reports: {error}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for report in &reports {
            println!(
                "run {}: deleted {} files ({} bytes), kept ticks {:?}",
                report.run_id,
                report.deleted_files.len(),
                report.deleted_bytes,
                report.kept_ticks
            );
        }
    }
    ExitCode::SUCCESS
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Seal {
            run_id,
            tick,
            runs,
            version,
        } => run_seal(&run_id, tick, runs, version),
        Command::Gate {
            artifacts_dir,
            run_id,
            runs,
        } => run_gate(&artifacts_dir, &run_id, runs),
        Command::Validate {
            artifacts_dir,
            run_id,
            tick,
            json,
        } => run_validate(&artifacts_dir, &run_id, tick, json),
        Command::Prune {
            artifacts_dir,
            run_id,
            json,
        } => run_prune(&artifacts_dir, run_id.as_deref(), json),
    }
}
