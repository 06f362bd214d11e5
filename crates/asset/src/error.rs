//! Error taxonomy for a single load pipeline.

use std::{fmt, io, path::PathBuf};

/// Errors that can end a load request.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("source '{0}' not found")]
    NotFound(PathBuf),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read stream: {0}")]
    Read(#[source] io::Error),

    #[error("malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("mesh invariant violated: {0}")]
    FatalInvariant(String),

    #[error("load cancelled before it started")]
    Cancelled,
}

/// Coarse classification of a [`LoadError`], cheap to copy and compare.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    NotFound,
    Io,
    MalformedRecord,
    FatalInvariant,
    Cancelled,
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::NotFound(_) => ErrorKind::NotFound,
            LoadError::Io { .. } | LoadError::Read(_) => ErrorKind::Io,
            LoadError::MalformedRecord { .. } => ErrorKind::MalformedRecord,
            LoadError::FatalInvariant(_) => ErrorKind::FatalInvariant,
            LoadError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        LoadError::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Io => "i/o error",
            ErrorKind::MalformedRecord => "malformed record",
            ErrorKind::FatalInvariant => "fatal invariant",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
