//! Read path: positional record fetches and whole-file frame scans.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{SegmentError, FRAME_HEADER_BYTES};

/// Reads framed records out of segment files by positional access.
///
/// Open read-only handles are cached per path; segments other than the
/// active one are immutable, so a cached handle never goes stale. The cache
/// is a performance concern only; every read seeks explicitly.
pub struct SegmentReader {
    handles: HashMap<PathBuf, File>,
}

impl SegmentReader {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Reads the framed record at `offset`, whose full frame (prefix plus
    /// payload) spans `total_size` bytes, and returns the payload.
    ///
    /// The on-disk length prefix is validated against `total_size`; a
    /// mismatch means the caller's locator and the file disagree, which is
    /// corruption.
    pub fn read_frame(
        &mut self,
        path: &Path,
        offset: u64,
        total_size: u64,
    ) -> Result<Vec<u8>, SegmentError> {
        let file = self.handle(path)?;
        file.seek(SeekFrom::Start(offset))?;

        let payload_len = file
            .read_u64::<BigEndian>()
            .map_err(|e| at_offset(path, offset, e, "length prefix extends past end of file"))?;

        if total_size != FRAME_HEADER_BYTES + payload_len {
            return Err(SegmentError::BadFrame {
                path: path.to_path_buf(),
                offset,
                detail: format!(
                    "length prefix {payload_len} disagrees with expected frame of {total_size} bytes"
                ),
            });
        }

        let mut payload = vec![0u8; payload_len as usize];
        file.read_exact(&mut payload)
            .map_err(|e| at_offset(path, offset, e, "frame extends past end of file"))?;
        Ok(payload)
    }

    /// Drops the cached handle for `path`, if any.
    pub fn evict(&mut self, path: &Path) {
        self.handles.remove(path);
    }

    fn handle(&mut self, path: &Path) -> Result<&mut File, io::Error> {
        match self.handles.entry(path.to_path_buf()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(v) => Ok(v.insert(File::open(path)?)),
        }
    }
}

impl Default for SegmentReader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("cached_handles", &self.handles.len())
            .finish()
    }
}

/// One framed record yielded by [`scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Offset of the frame's length prefix within the segment file.
    pub offset: u64,
    /// Prefix plus payload bytes.
    pub total_size: u64,
    /// The codec payload.
    pub payload: Vec<u8>,
}

/// Opens `path` for sequential frame iteration from offset 0.
pub fn scan(path: &Path) -> Result<FrameIter, SegmentError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    Ok(FrameIter {
        reader: BufReader::new(file),
        path: path.to_path_buf(),
        file_len,
        offset: 0,
        done: false,
    })
}

/// Sequential iterator over the frames of one segment file.
///
/// Termination:
/// - clean end-of-file at a frame boundary ends the iteration;
/// - a truncated trailing frame (short prefix, or a declared payload
///   extending past end-of-file, as left by a crash mid-append) ends
///   the iteration after the last intact record, with a warning;
/// - an I/O error is yielded as an error.
pub struct FrameIter {
    reader: BufReader<File>,
    path: PathBuf,
    file_len: u64,
    offset: u64,
    done: bool,
}

impl Iterator for FrameIter {
    type Item = Result<Frame, SegmentError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let payload_len = match read_prefix(&mut self.reader) {
            Ok(Prefix::Eof) => {
                self.done = true;
                return None;
            }
            Ok(Prefix::Truncated) => {
                tracing::warn!(
                    file = %self.path.display(),
                    offset = self.offset,
                    "truncated length prefix at end of segment, stopping scan"
                );
                self.done = true;
                return None;
            }
            Ok(Prefix::Len(len)) => len,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };

        // Checked before allocating: a payload the file cannot contain is a
        // torn tail (or a prefix lying about its length), not a read target.
        let remaining = self.file_len - (self.offset + FRAME_HEADER_BYTES);
        if payload_len > remaining {
            tracing::warn!(
                file = %self.path.display(),
                offset = self.offset,
                payload_len,
                remaining,
                "payload extends past end of segment, stopping scan"
            );
            self.done = true;
            return None;
        }

        let mut payload = vec![0u8; payload_len as usize];
        if let Err(e) = self.reader.read_exact(&mut payload) {
            self.done = true;
            return Some(Err(e.into()));
        }

        let frame = Frame {
            offset: self.offset,
            total_size: FRAME_HEADER_BYTES + payload_len,
            payload,
        };
        self.offset += frame.total_size;
        Some(Ok(frame))
    }
}

enum Prefix {
    /// End of file exactly at a frame boundary.
    Eof,
    /// End of file inside the 8-byte prefix.
    Truncated,
    Len(u64),
}

/// Reads the 8-byte prefix, distinguishing a clean boundary EOF from a
/// partial one (`read_exact` reports both as `UnexpectedEof`).
fn read_prefix<R: Read>(reader: &mut R) -> Result<Prefix, io::Error> {
    let mut buf = [0u8; 8];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    Prefix::Eof
                } else {
                    Prefix::Truncated
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Prefix::Len(u64::from_be_bytes(buf)))
}

fn at_offset(path: &Path, offset: u64, err: io::Error, detail: &str) -> SegmentError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        SegmentError::BadFrame {
            path: path.to_path_buf(),
            offset,
            detail: detail.to_string(),
        }
    } else {
        SegmentError::Io(err)
    }
}
