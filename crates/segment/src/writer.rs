//! Append path: the single active segment file and its rollover.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{SegmentError, DATA_FILE_SUFFIX, DEFAULT_MAX_FILE_SIZE, FRAME_HEADER_BYTES};

/// The one segment file currently open for appending.
struct ActiveSegment {
    file: File,
    path: PathBuf,
    /// Numeric filename stem (`<stamp>.data`).
    stamp: i64,
    /// Logical size; equals the file length after every successful append.
    size: u64,
}

/// Append-only writer for the active segment.
///
/// Frames each payload with an 8-byte big-endian length prefix and writes the
/// whole frame with a single `write_all`. There is no buffering, so appended
/// bytes are immediately visible to positional reads on the same file. When the
/// next frame would push the file past `max_file_size`, the writer closes the
/// active file and opens a fresh one first. Rolled-over files are never
/// written again.
pub struct SegmentWriter {
    dir: PathBuf,
    active: Option<ActiveSegment>,
    max_file_size: u64,
    sync_on_append: bool,
    /// Reusable scratch buffer to avoid allocation on every append.
    buf: Vec<u8>,
}

impl SegmentWriter {
    /// Creates the data directory if absent and opens a fresh active segment.
    ///
    /// The new segment's stamp never collides with an existing `.data` file:
    /// it is the current Unix time or one past the highest stamp already on
    /// disk, whichever is greater.
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self, SegmentError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let stamp = match max_existing_stamp(&dir)? {
            Some(existing) => unix_seconds().max(existing + 1),
            None => unix_seconds(),
        };
        let active = open_segment(&dir, stamp)?;

        Ok(Self {
            dir,
            active: Some(active),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            sync_on_append: false,
            buf: Vec::with_capacity(256),
        })
    }

    /// Appends one framed payload to the active segment, rolling over first
    /// when the frame would push the file past the size cap.
    ///
    /// Returns the offset of the frame's length prefix within the file that
    /// received it. On a failed or partial write the logical size is not
    /// advanced and the error is surfaced; the garbage tail is overwritten by
    /// the next append, which always writes at the logical offset.
    pub fn append(&mut self, payload: &[u8]) -> Result<u64, SegmentError> {
        if self.active.is_none() {
            return Err(SegmentError::Closed);
        }

        let total = FRAME_HEADER_BYTES + payload.len() as u64;
        let size = self.active.as_ref().map(|a| a.size).unwrap_or(0);
        if size > 0 && size + total > self.max_file_size {
            self.rollover()?;
        }

        let active = self.active.as_mut().ok_or(SegmentError::Closed)?;
        let offset = active.size;

        self.buf.clear();
        self.buf
            .extend_from_slice(&(payload.len() as u64).to_be_bytes());
        self.buf.extend_from_slice(payload);

        active.file.seek(SeekFrom::Start(offset))?;
        active.file.write_all(&self.buf)?;
        if self.sync_on_append {
            active.file.sync_all()?;
        }

        active.size += total;
        Ok(offset)
    }

    /// Closes the active segment and opens the next one.
    pub fn rollover(&mut self) -> Result<(), SegmentError> {
        let prev = self.active.take().ok_or(SegmentError::Closed)?;
        prev.file.sync_all()?;
        let prev_path = prev.path;
        let prev_size = prev.size;

        // Never reuse or go below the previous stamp: filenames must keep
        // sorting in creation order even under same-second rollovers.
        let stamp = unix_seconds().max(prev.stamp + 1);
        let next = open_segment(&self.dir, stamp)?;
        tracing::debug!(
            closed = %prev_path.display(),
            closed_size = prev_size,
            opened = %next.path.display(),
            "segment rollover"
        );
        self.active = Some(next);
        Ok(())
    }

    /// Flushes the active segment to disk.
    pub fn sync(&mut self) -> Result<(), SegmentError> {
        let active = self.active.as_mut().ok_or(SegmentError::Closed)?;
        active.file.sync_all()?;
        Ok(())
    }

    /// Closes the active segment. Idempotent; appends afterwards fail with
    /// [`SegmentError::Closed`].
    pub fn close(&mut self) -> Result<(), SegmentError> {
        if let Some(active) = self.active.take() {
            active.file.sync_all()?;
        }
        Ok(())
    }

    /// `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.active.is_none()
    }

    /// Path of the segment currently open for appending, if any.
    pub fn active_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    /// Logical size of the active segment.
    pub fn active_size(&self) -> u64 {
        self.active.as_ref().map(|a| a.size).unwrap_or(0)
    }

    /// The size cap at which appends trigger rollover.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Updates the size cap. Meant to be called before the first append.
    pub fn set_max_file_size(&mut self, size: u64) {
        self.max_file_size = size;
    }

    /// When set, every append is followed by `sync_all` before returning.
    pub fn set_sync_on_append(&mut self, sync: bool) {
        self.sync_on_append = sync;
    }
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("dir", &self.dir)
            .field("active_path", &self.active_path())
            .field("active_size", &self.active_size())
            .field("max_file_size", &self.max_file_size)
            .field("sync_on_append", &self.sync_on_append)
            .finish()
    }
}

fn open_segment(dir: &Path, stamp: i64) -> Result<ActiveSegment, SegmentError> {
    let path = dir.join(format!("{stamp}.{DATA_FILE_SUFFIX}"));
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&path)?;
    let size = file.metadata()?.len();
    Ok(ActiveSegment {
        file,
        path,
        stamp,
        size,
    })
}

/// Highest numeric stamp among existing `.data` files, if any.
fn max_existing_stamp(dir: &Path) -> Result<Option<i64>, SegmentError> {
    let mut max = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let stamp = name
            .to_str()
            .and_then(|n| n.strip_suffix(&format!(".{DATA_FILE_SUFFIX}")))
            .and_then(|stem| stem.parse::<i64>().ok());
        if let Some(stamp) = stamp {
            max = Some(max.map_or(stamp, |m: i64| m.max(stamp)));
        }
    }
    Ok(max)
}

/// Current wall-clock time in whole seconds since the Unix epoch.
fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
