//! # Segment - DriftKV append-only data files
//!
//! Owns the on-disk life of records: the [`SegmentWriter`] appends framed
//! payloads to the single active segment file and rolls over to a fresh file
//! when the size cap would be exceeded; the [`SegmentReader`] fetches one
//! framed record from any segment by positional read; [`scan`] walks a whole
//! segment frame by frame for index rebuilds.
//!
//! ## Frame Format
//!
//! ```text
//! +--------+-------------------------+
//! |  8 B   |        L bytes          |
//! | len=L  |     codec payload       |
//! | (BE)   |                         |
//! +--------+-------------------------+
//! ```
//!
//! `L` is the unsigned 64-bit big-endian payload length. A segment file is a
//! pure concatenation of frames, with no padding, no file header, and no
//! footer.
//! Payload bytes are opaque here; encoding and checksums live in the `codec`
//! crate.
//!
//! ## Naming
//!
//! Segment files are named `<unix_seconds>.data` after their creation time.
//! Stamps are strictly increasing: two rollovers within the same second take
//! the previous stamp plus one, so filenames always sort in creation order.

mod reader;
mod writer;

pub use reader::{scan, Frame, FrameIter, SegmentReader};
pub use writer::SegmentWriter;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Bytes occupied by the length prefix in front of every payload.
pub const FRAME_HEADER_BYTES: u64 = 8;

/// Extension carried by every segment file.
pub const DATA_FILE_SUFFIX: &str = "data";

/// Default size cap at which the writer rolls over to a new segment.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Errors produced by segment file operations.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// An underlying filesystem error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A write was attempted after the writer was closed.
    #[error("segment writer is closed")]
    Closed,

    /// A frame is inconsistent with the file that holds it.
    #[error("bad frame in {} at offset {offset}: {detail}", .path.display())]
    BadFrame {
        path: PathBuf,
        offset: u64,
        detail: String,
    },
}
