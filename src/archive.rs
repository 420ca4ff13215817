use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::error::{Error, Result};

pub const CLASS_SUFFIX: &str = ".class";

/// Upper bound on the buffer reserved from an entry's declared size. The
/// header is archive-controlled; larger entries still read fine, they just
/// grow the buffer as they go.
const PREALLOC_LIMIT: u64 = 1 << 20;

fn map_archive(path: &Path) -> Result<Mmap> {
    let file = File::open(path).map_err(|e| Error::archive_read(path, e))?;
    // SAFETY: The file is opened read-only and the mapping is dropped before
    // this function's caller returns; nothing in this process writes to it.
    unsafe { Mmap::map(&file) }.map_err(|e| Error::archive_read(path, e))
}

/// Hands every `.class` entry of the archive to `visit` as `(name, bytes)`.
/// Directory and non-class entries are skipped. Each entry's bytes live only
/// for the duration of its visit.
pub fn for_each_class_entry<F>(path: &Path, mut visit: F) -> Result<usize>
where
    F: FnMut(&str, Vec<u8>),
{
    let mmap = map_archive(path)?;
    let mut archive =
        ZipArchive::new(Cursor::new(&mmap[..])).map_err(|e| Error::archive_read(path, e))?;

    let mut visited = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::archive_read(path, e))?;
        if entry.is_dir() || !entry.name().ends_with(CLASS_SUFFIX) {
            continue;
        }

        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(entry.size().min(PREALLOC_LIMIT) as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| Error::archive_read(path, e))?;
        visit(&name, bytes);
        visited += 1;
    }
    Ok(visited)
}

/// Hex SHA-256 of the archive file.
pub fn archive_digest(path: &Path) -> Result<String> {
    let mmap = map_archive(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&mmap[..]);
    Ok(hex::encode(hasher.finalize()))
}
