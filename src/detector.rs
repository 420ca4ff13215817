//! Archive → class → method pipeline with per-unit failure isolation.
//!
//! A method that fails to decode is dropped from its class, a class that fails
//! to decode is dropped from its archive, and an archive that cannot be read is
//! reported as failed. None of these stop the batch.

use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::aggregate::{MatchReport, ReportMode};
use crate::archive::{archive_digest, for_each_class_entry};
use crate::class_file::ClassFile;
use crate::error::{Diagnostic, UnitKind};
use crate::scanner::{PackagePrefix, ScanOptions, scan_class};

#[derive(Debug, Clone)]
pub struct Detector {
    prefix: PackagePrefix,
    options: ScanOptions,
    mode: ReportMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveStatus {
    Matched,
    NoMatch,
    Failed,
}

/// Outcome of scanning a set of class entries.
#[derive(Debug, Clone, Serialize)]
pub struct ClassesReport {
    pub classes_scanned: usize,
    pub classes_failed: usize,
    pub methods_scanned: usize,
    pub methods_failed: usize,
    pub matches: MatchReport,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub sha256: Option<String>,
    pub status: ArchiveStatus,
    pub package: String,
    #[serde(flatten)]
    pub classes: ClassesReport,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub archives: usize,
    pub matched: usize,
    pub no_match: usize,
    pub failed: usize,
    pub total_matches: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[ArchiveReport]) -> Self {
        let mut summary = Self {
            archives: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match report.status {
                ArchiveStatus::Matched => summary.matched += 1,
                ArchiveStatus::NoMatch => summary.no_match += 1,
                ArchiveStatus::Failed => summary.failed += 1,
            }
            summary.total_matches += report.classes.matches.len();
        }
        summary
    }
}

impl ClassesReport {
    fn new(mode: ReportMode) -> Self {
        Self {
            classes_scanned: 0,
            classes_failed: 0,
            methods_scanned: 0,
            methods_failed: 0,
            matches: MatchReport::new(mode),
            diagnostics: Vec::new(),
        }
    }
}

impl Detector {
    pub fn new(prefix: PackagePrefix, options: ScanOptions, mode: ReportMode) -> Self {
        Self {
            prefix,
            options,
            mode,
        }
    }

    pub fn prefix(&self) -> &PackagePrefix {
        &self.prefix
    }

    /// Decodes and scans one class entry, folding the outcome into `report`.
    fn scan_entry(&self, report: &mut ClassesReport, name: &str, bytes: &[u8]) {
        let class = match ClassFile::parse(bytes) {
            Ok(class) => class,
            Err(e) => {
                report.classes_failed += 1;
                report
                    .diagnostics
                    .push(Diagnostic::new(UnitKind::Class, name, &e));
                return;
            }
        };
        log::debug!("scanning {} ({} methods)", class.name(), class.methods().len());

        let scan = scan_class(&class, &self.prefix, self.options);
        report.classes_scanned += 1;
        report.methods_scanned += scan.methods_scanned;
        report.methods_failed += scan.diagnostics.len();
        report.matches.extend(scan.matches);
        report.diagnostics.extend(scan.diagnostics);
    }

    /// Runs decode → scan → aggregate over in-memory `(entry name, bytes)`
    /// pairs.
    pub fn analyze_classes<I, N, B>(&self, entries: I) -> ClassesReport
    where
        I: IntoIterator<Item = (N, B)>,
        N: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let mut report = ClassesReport::new(self.mode);
        for (name, bytes) in entries {
            self.scan_entry(&mut report, name.as_ref(), bytes.as_ref());
        }
        report
    }

    /// Scans one archive. Class bytes are released as soon as each class has
    /// been scanned. If the archive cannot be read, matches found so far are
    /// discarded and the report is marked failed; diagnostics are kept.
    pub fn analyze_archive(&self, path: &Path) -> ArchiveReport {
        let start = Instant::now();
        let mut classes = ClassesReport::new(self.mode);

        let outcome = archive_digest(path).and_then(|digest| {
            for_each_class_entry(path, |name, bytes| {
                self.scan_entry(&mut classes, name, &bytes)
            })?;
            Ok(digest)
        });

        let (status, sha256) = match outcome {
            Ok(digest) if classes.matches.is_empty() => (ArchiveStatus::NoMatch, Some(digest)),
            Ok(digest) => (ArchiveStatus::Matched, Some(digest)),
            Err(e) => {
                classes.matches = MatchReport::new(self.mode);
                classes
                    .diagnostics
                    .push(Diagnostic::new(UnitKind::Archive, path.display().to_string(), &e));
                (ArchiveStatus::Failed, None)
            }
        };

        match status {
            ArchiveStatus::Matched => log::info!(
                "The app {} contains {} calls to package {}",
                path.display(),
                classes.matches.len(),
                self.prefix.dotted()
            ),
            ArchiveStatus::NoMatch => log::info!(
                "The app {} does not contain any call to package {}",
                path.display(),
                self.prefix.dotted()
            ),
            ArchiveStatus::Failed => log::error!("Failed to process file {}", path.display()),
        }

        ArchiveReport {
            path: path.to_path_buf(),
            sha256,
            status,
            package: self.prefix.dotted(),
            classes,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Scans archives in parallel. Reports come back in input order.
    pub fn analyze_batch(&self, paths: &[PathBuf]) -> Vec<ArchiveReport> {
        paths
            .par_iter()
            .map(|path| self.analyze_archive(path))
            .collect()
    }
}
