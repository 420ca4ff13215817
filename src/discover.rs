use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

pub const DEFAULT_EXTENSIONS: &[&str] = &["jar"];

pub fn has_archive_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
}

/// Lists the archives under `dir`. Only direct children unless `recursive`.
/// Files with other extensions are logged and skipped. The result is sorted so
/// batch output is deterministic.
pub fn find_archives(dir: &Path, extensions: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let meta = std::fs::metadata(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    if !meta.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let (tx, rx) = mpsc::channel();

    let mut builder = WalkBuilder::new(dir);
    builder
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false);
    if !recursive {
        builder.max_depth(Some(1));
    }
    let walker = builder.build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        Box::new(move |entry| {
            if let Ok(entry) = entry
                && entry.file_type().is_some_and(|t| t.is_file())
            {
                let _ = tx.send(entry.into_path());
            }
            ignore::WalkState::Continue
        })
    });

    drop(tx);
    let mut archives = Vec::new();
    for path in rx.iter() {
        if has_archive_extension(&path, extensions) {
            archives.push(path);
        } else {
            log::info!("Skipping file {}", path.display());
        }
    }
    archives.sort();
    Ok(archives)
}
