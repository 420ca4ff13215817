use clap::{ArgGroup, Parser};
use std::path::PathBuf;

use crate::aggregate::ReportMode;
use crate::report::ReportFormat;

#[derive(Debug, Clone, Parser)]
#[command(name = "lib-usage")]
#[command(about = "Find the methods in compiled JVM archives that call into a package")]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["application", "directory"])
))]
pub struct Cli {
    /// Archive to scan.
    #[arg(short = 'a', long, value_name = "JAR")]
    pub application: Option<PathBuf>,

    /// Directory of archives to scan.
    #[arg(short = 'd', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Package whose callers are reported, e.g. `org.apache.commons`.
    #[arg(short = 'p', long, value_name = "PKG")]
    pub package: String,

    /// Directory reports are written to.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value_t = ReportFormat::Log)]
    pub format: ReportFormat,

    #[arg(short = 'm', long, value_enum, default_value_t = ReportMode::ByClass)]
    pub mode: ReportMode,

    /// Also report field reads and writes.
    #[arg(long)]
    pub fields: bool,

    /// Descend into sub-directories of `--directory`.
    #[arg(long)]
    pub recursive: bool,

    /// Archive extension to pick up from `--directory`. Repeatable.
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Print the batch summary as JSON on stdout.
    #[arg(long)]
    pub summary_json: bool,

    #[arg(short = 'v', long)]
    pub verbose: bool,
}
