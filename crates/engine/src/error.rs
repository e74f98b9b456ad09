//! Engine error taxonomy.
//!
//! Callers match on these variants: a missing key (`NotFound`) is routine, a
//! located tombstone (`Deleted`) is a diagnosable oddity, and everything else
//! means the store or its files are in trouble. Corruption always carries the
//! file and offset involved.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by [`Engine`](crate::Engine) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The key is absent from the directory.
    #[error("key not found")]
    NotFound,

    /// The directory entry located a tombstone. The directory should never
    /// hold one; seeing this means a replay or write-path invariant broke.
    #[error("key has been deleted")]
    Deleted,

    /// A framed record could not be decoded, or its frame is inconsistent
    /// with the file that holds it.
    #[error("corrupt record in {} at offset {offset}: {reason}", .file.display())]
    Corrupt {
        file: PathBuf,
        offset: u64,
        reason: String,
    },

    /// An underlying filesystem error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Operation attempted after [`close`](crate::Engine::close).
    #[error("engine is closed")]
    Closed,
}

impl Error {
    pub(crate) fn corrupt(file: &Path, offset: u64, reason: impl std::fmt::Display) -> Self {
        Error::Corrupt {
            file: file.to_path_buf(),
            offset,
            reason: reason.to_string(),
        }
    }
}

impl From<segment::SegmentError> for Error {
    fn from(err: segment::SegmentError) -> Self {
        match err {
            segment::SegmentError::Io(e) => Error::Io(e),
            segment::SegmentError::Closed => Error::Closed,
            segment::SegmentError::BadFrame {
                path,
                offset,
                detail,
            } => Error::Corrupt {
                file: path,
                offset,
                reason: detail,
            },
        }
    }
}

/// Engine result type.
pub type Result<T> = std::result::Result<T, Error>;
