//! Subcommand bodies. Each returns the process exit code.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use bandjoin_datagen::generate_databases;
use bandjoin_error::{BandJoinError, Result};
use bandjoin_exec::{
    Comparison, CsvSink, JoinConfig, JoinMetrics, SqliteRelation, run_all_variants, run_join,
};
use serde::Serialize;
use tracing::{error, info};

use crate::args::{CompareArgs, GenerateArgs, RunArgs};

/// JSON report written by `run --report`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub db1: PathBuf,
    pub db2: PathBuf,
    pub output: PathBuf,
    pub config: JoinConfig,
    pub metrics: JoinMetrics,
}

/// JSON report written by `compare --report`.
#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub config: JoinConfig,
    pub metrics: Vec<JoinMetrics>,
    pub comparison: Comparison,
}

fn exit_code(result: Result<i32>) -> i32 {
    result.unwrap_or_else(|err| {
        error!(kind = err.kind(), %err, "command failed");
        eprintln!("error: {err}");
        1
    })
}

fn create_csv(path: &Path) -> Result<CsvSink<BufWriter<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(CsvSink::new(BufWriter::new(File::create(path)?)))
}

fn write_report(path: &Path, report: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| BandJoinError::internal(format!("report serialization: {e}")))?;
    fs::write(path, json)?;
    info!(path = %path.display(), "report written");
    Ok(())
}

// ─── generate ──────────────────────────────────────────────────────────

pub fn generate(args: &GenerateArgs) -> i32 {
    exit_code(
        generate_databases(&args.config, &args.dir, &args.db1, &args.db2).map(|pair| {
            println!(
                "wrote {} projects to {} and {} employees to {}",
                pair.projects,
                pair.db1.display(),
                pair.employees,
                pair.db2.display()
            );
            0
        }),
    )
}

// ─── run ───────────────────────────────────────────────────────────────

pub fn run(args: &RunArgs) -> i32 {
    exit_code(run_inner(args))
}

fn run_inner(args: &RunArgs) -> Result<i32> {
    let config = args.join.resolve()?;
    let first = SqliteRelation::open(&args.db1)?;
    let second = SqliteRelation::open(&args.db2)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(args.strategy.csv_file_name(config.invert_join)));

    let mut sink = create_csv(&output)?;
    let metrics = run_join(args.strategy, &first, &second, &config, &mut sink)?;
    println!(
        "{}: {} rows in {:.3}s, written to {}",
        metrics.variant,
        metrics.row_count,
        metrics.total_time_seconds(),
        output.display()
    );

    if let Some(path) = &args.report {
        write_report(
            path,
            &RunReport {
                db1: args.db1.clone(),
                db2: args.db2.clone(),
                output,
                config,
                metrics,
            },
        )?;
    }
    Ok(0)
}

// ─── compare ───────────────────────────────────────────────────────────

pub fn compare(args: &CompareArgs) -> i32 {
    exit_code(compare_inner(args))
}

fn compare_inner(args: &CompareArgs) -> Result<i32> {
    let config = args.join.resolve()?;
    let first = SqliteRelation::open(&args.db1)?;
    let second = SqliteRelation::open(&args.db2)?;
    fs::create_dir_all(&args.out_dir)?;

    let (metrics, comparison) = run_all_variants(&first, &second, &config, |strategy, inverted| {
        create_csv(&args.out_dir.join(strategy.csv_file_name(inverted)))
    })?;

    for m in &metrics {
        println!(
            "{:<40} rows={:<10} total={:.3}s memory={:.2}MiB",
            m.variant,
            m.row_count,
            m.total_time_seconds(),
            m.total_memory_bytes() as f64 / (1024.0 * 1024.0)
        );
    }
    let code = match comparison.first_divergence() {
        None => {
            println!(
                "all {} variants agree on {} rows",
                comparison.variants_compared, comparison.reference_row_count
            );
            0
        }
        Some(divergence) => {
            println!(
                "MISMATCH: {} produced {} rows, {} produced {} (first difference at {})",
                divergence.variant,
                divergence.row_count,
                comparison.reference,
                comparison.reference_row_count,
                divergence.first_difference
            );
            1
        }
    };

    if let Some(path) = &args.report {
        write_report(
            path,
            &CompareReport {
                config,
                metrics,
                comparison,
            },
        )?;
    }
    Ok(code)
}
