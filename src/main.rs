use anyhow::Result;
use clap::Parser;
use lib_usage::cli::Cli;
use lib_usage::config::{build_detector, resolve_output_dir, resolve_targets};
use lib_usage::detector::{ArchiveStatus, BatchSummary};
use lib_usage::report::write_report;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Serialize)]
struct ArchiveOutcome {
    path: PathBuf,
    status: ArchiveStatus,
    matches: usize,
    report: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    package: String,
    output_dir: PathBuf,
    #[serde(flatten)]
    batch: BatchSummary,
    write_failures: usize,
    duration_ms: u64,
    archives: Vec<ArchiveOutcome>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // info+ on stderr; --verbose enables debug; RUST_LOG overrides
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("lib_usage", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let start = Instant::now();
    let targets = resolve_targets(&cli)?;
    if targets.is_empty() {
        log::warn!("No archives to scan");
    }
    let output_dir = resolve_output_dir(&cli);
    let detector = build_detector(&cli);

    let reports = detector.analyze_batch(&targets);

    let mut write_failures = 0usize;
    let mut archives = Vec::with_capacity(reports.len());
    for report in &reports {
        let written = if report.status == ArchiveStatus::Matched {
            match write_report(&output_dir, report, detector.prefix(), cli.format) {
                Ok(path) => {
                    log::info!("Wrote {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    log::error!("Failed to write report for {}: {e:#}", report.path.display());
                    write_failures += 1;
                    None
                }
            }
        } else {
            None
        };
        archives.push(ArchiveOutcome {
            path: report.path.clone(),
            status: report.status,
            matches: report.classes.matches.len(),
            report: written,
        });
    }

    let batch = BatchSummary::from_reports(&reports);
    log::info!(
        "Scanned {} archives: {} matched, {} without matches, {} failed",
        batch.archives,
        batch.matched,
        batch.no_match,
        batch.failed
    );

    if cli.summary_json {
        let summary = RunSummary {
            package: detector.prefix().dotted(),
            output_dir,
            batch,
            write_failures,
            duration_ms: start.elapsed().as_millis() as u64,
            archives,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
