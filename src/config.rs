use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::detector::Detector;
use crate::discover::{DEFAULT_EXTENSIONS, find_archives};
use crate::scanner::{PackagePrefix, ScanOptions};

pub const OUTPUT_ENV: &str = "LIB_USAGE_OUTPUT";

/// `--output`, else `$LIB_USAGE_OUTPUT`, else the current directory.
pub fn resolve_output_dir(cli: &Cli) -> PathBuf {
    output_dir_from(cli.output.as_deref(), std::env::var_os(OUTPUT_ENV).map(PathBuf::from))
}

fn output_dir_from(flag: Option<&Path>, env: Option<PathBuf>) -> PathBuf {
    if let Some(p) = flag {
        return p.to_path_buf();
    }
    if let Some(p) = env.filter(|p| !p.as_os_str().is_empty()) {
        return p;
    }
    log::info!("Output directory not set, using current directory");
    PathBuf::from(".")
}

pub fn resolve_extensions(cli: &Cli) -> Vec<String> {
    if cli.extensions.is_empty() {
        return DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
    }
    cli.extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_string())
        .collect()
}

/// The archives to scan: the single application, or every archive found in
/// the directory.
pub fn resolve_targets(cli: &Cli) -> Result<Vec<PathBuf>> {
    if let Some(app) = &cli.application {
        return Ok(vec![app.clone()]);
    }
    match &cli.directory {
        Some(dir) => find_archives(dir, &resolve_extensions(cli), cli.recursive),
        None => anyhow::bail!("Either --application or --directory is required"),
    }
}

pub fn build_detector(cli: &Cli) -> Detector {
    Detector::new(
        PackagePrefix::from_package(&cli.package),
        ScanOptions {
            include_field_access: cli.fields,
        },
        cli.mode,
    )
}
