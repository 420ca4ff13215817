//! Error types for class-file decoding and archive reading.
//!
//! Every decode boundary (archive, class, method) returns a `Result<_, Error>`.
//! The caller owning that boundary decides whether to absorb the failure and
//! continue with sibling units; see [`crate::detector`].

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a class file (bad magic number)")]
    NotAClassFile,

    #[error("unsupported class file version {major}.{minor}")]
    UnsupportedClassVersion { major: u16, minor: u16 },

    #[error("malformed class file: {0}")]
    MalformedClassFile(String),

    #[error("malformed constant pool: {0}")]
    MalformedConstantPool(String),

    #[error("malformed bytecode at offset {offset}: {reason}")]
    MalformedBytecode { offset: usize, reason: String },

    #[error("failed to read archive {}: {source}", path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Fieldless mirror of [`Error`], used in diagnostics and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    NotAClassFile,
    UnsupportedClassVersion,
    MalformedClassFile,
    MalformedConstantPool,
    MalformedBytecode,
    ArchiveRead,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotAClassFile => ErrorKind::NotAClassFile,
            Error::UnsupportedClassVersion { .. } => ErrorKind::UnsupportedClassVersion,
            Error::MalformedClassFile(_) => ErrorKind::MalformedClassFile,
            Error::MalformedConstantPool(_) => ErrorKind::MalformedConstantPool,
            Error::MalformedBytecode { .. } => ErrorKind::MalformedBytecode,
            Error::ArchiveRead { .. } => ErrorKind::ArchiveRead,
        }
    }

    pub(crate) fn archive_read(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Error::ArchiveRead {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// The unit a decode failure was absorbed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Archive,
    Class,
    Method,
}

/// A decode failure that was absorbed at a unit boundary: which unit, which
/// one, and what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub unit: UnitKind,
    pub identity: String,
    pub error: ErrorKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(unit: UnitKind, identity: impl Into<String>, error: &Error) -> Self {
        let diagnostic = Self {
            unit,
            identity: identity.into(),
            error: error.kind(),
            message: error.to_string(),
        };
        log::warn!(
            "skipping {:?} {}: {}",
            diagnostic.unit,
            diagnostic.identity,
            diagnostic.message
        );
        diagnostic
    }
}
