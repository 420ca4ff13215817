use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

use crate::detector::ArchiveReport;
use crate::scanner::PackagePrefix;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// One line per calling method.
    #[default]
    Log,
    /// `caller,callee` rows.
    Csv,
    /// The full archive report.
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Log => "log",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

/// `app.jar` scanned for `com.acme` gives `app.jar_com.acme.log`.
pub fn report_file_name(archive: &Path, prefix: &PackagePrefix, format: ReportFormat) -> String {
    let archive_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string());
    format!("{archive_name}_{}.{}", prefix.dotted(), format.extension())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn render(report: &ArchiveReport, format: ReportFormat) -> Result<String> {
    let content = match format {
        ReportFormat::Log => {
            let mut out = String::new();
            for caller in report.classes.matches.callers() {
                out.push_str(caller);
                out.push('\n');
            }
            out
        }
        ReportFormat::Csv => {
            let mut out = String::from("caller,callee\n");
            for m in report.classes.matches.iter() {
                out.push_str(&format!("{},{}\n", csv_field(&m.caller), csv_field(&m.callee)));
            }
            out
        }
        ReportFormat::Json => {
            let mut out = serde_json::to_string_pretty(report)?;
            out.push('\n');
            out
        }
    };
    Ok(content)
}

/// Renders `report` into `dir`, creating the directory if needed. Returns the
/// written path.
pub fn write_report(
    dir: &Path,
    report: &ArchiveReport,
    prefix: &PackagePrefix,
    format: ReportFormat,
) -> Result<PathBuf> {
    let content = render(report, format)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    let path = dir.join(report_file_name(&report.path, prefix, format));
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(path)
}
