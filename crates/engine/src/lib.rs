//! # Engine - DriftKV Storage Engine
//!
//! The central orchestrator that ties together the [`codec`], [`segment`],
//! and [`keydir`] crates into a complete Bitcask-style key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client (any thread)
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │         (one mutex around everything)         │
//! │                                               │
//! │ write.rs → codec encode → segment append      │
//! │              |         (rollover if needed)   │
//! │              v                                │
//! │           keydir insert / remove              │
//! │                                               │
//! │ read.rs → keydir lookup → positional read     │
//! │              → codec decode → value           │
//! │                                               │
//! │ recovery.rs → enumerate *.data → temporal     │
//! │              replay → last-writer-wins keydir │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module     | Purpose                                                   |
//! |------------|-----------------------------------------------------------|
//! | `lib.rs`   | `Engine` struct, constructors, accessors, `Debug`, `Drop` |
//! | [`config`] | `Config`: segment size cap, fsync-per-put                 |
//! | [`error`]  | typed error taxonomy                                      |
//! | `write`    | `put()`, `delete()`, `sync()`, `close()`                  |
//! | `read`     | `get()`                                                   |
//! | `recovery` | `build_index()`: segment replay                           |
//!
//! ## Concurrency
//!
//! One mutex guards the key directory, the active segment writer, and the
//! read handle cache. Every operation holds it for its whole duration, so
//! writes and reads observe a total order: a `get` sees the effect of every
//! `put`/`delete` that completed before it started. No background threads,
//! no internal queues.
//!
//! ## Durability
//!
//! Every mutation is appended to the active segment before the directory is
//! updated; a failed append leaves the directory unchanged. Appends are
//! plain writes (no fsync) unless [`Config::sync_on_put`] is set. On
//! restart, [`Engine::build_index`] reconstructs the directory by replaying
//! all segment files in temporal order.

mod config;
mod error;
mod read;
mod recovery;
mod write;

pub use config::Config;
pub use error::{Error, Result};

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use keydir::KeyDir;
use segment::{SegmentReader, SegmentWriter};

/// The storage engine: an append-only segment log plus an in-memory key
/// directory pointing at the newest record of every live key.
///
/// `Engine` is `Send + Sync`; sharing one instance via `Arc` is the intended
/// multi-threaded usage.
pub struct Engine {
    dir: PathBuf,
    inner: Mutex<Inner>,
}

pub(crate) struct Inner {
    pub(crate) keydir: KeyDir,
    pub(crate) writer: SegmentWriter,
    pub(crate) reader: SegmentReader,
    pub(crate) closed: bool,
}

impl Inner {
    pub(crate) fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }
}

impl Engine {
    /// Opens an engine on `dir` with the default [`Config`].
    ///
    /// Creates the directory if absent and opens a fresh active segment.
    /// The key directory starts **empty**: prior data in `dir` stays on disk
    /// but is invisible until [`build_index`](Self::build_index) is called.
    /// A caller that `put`s before rebuilding will not see older records,
    /// and its new records shadow them once the index is eventually rebuilt.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::open_with(dir, Config::default())
    }

    /// Opens an engine on `dir` with an explicit [`Config`].
    pub fn open_with<P: AsRef<Path>>(dir: P, config: Config) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut writer = SegmentWriter::create(&dir)?;
        writer.set_max_file_size(config.max_file_size);
        writer.set_sync_on_append(config.sync_on_put);

        Ok(Self {
            dir,
            inner: Mutex::new(Inner {
                keydir: KeyDir::new(),
                writer,
                reader: SegmentReader::new(),
                closed: false,
            }),
        })
    }

    /// The data directory this engine was opened on.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Number of live keys in the directory.
    pub fn key_count(&self) -> Result<usize> {
        Ok(self.lock()?.keydir.len())
    }

    /// `true` when no live keys are indexed.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.keydir.is_empty())
    }

    /// Path of the segment currently receiving appends.
    pub fn active_segment_path(&self) -> Result<Option<PathBuf>> {
        Ok(self.lock()?.writer.active_path().map(Path::to_path_buf))
    }

    /// The segment size cap at which appends roll over.
    pub fn max_file_size(&self) -> Result<u64> {
        Ok(self.lock()?.writer.max_file_size())
    }

    /// Updates the segment size cap. Meant to be called before the first
    /// `put`; records already written are unaffected either way.
    pub fn set_max_file_size(&self, size: u64) -> Result<()> {
        self.lock()?.writer.set_max_file_size(size);
        Ok(())
    }

    /// Enables or disables fsync-per-put.
    pub fn set_sync_on_put(&self, sync: bool) -> Result<()> {
        self.lock()?.writer.set_sync_on_append(sync);
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "engine mutex poisoned by a panicking thread",
            ))
        })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Engine");
        s.field("dir", &self.dir);
        if let Ok(inner) = self.inner.try_lock() {
            s.field("keys", &inner.keydir.len())
                .field("active_segment", &inner.writer.active_path())
                .field("closed", &inner.closed);
        }
        s.finish()
    }
}

/// Best-effort close on drop. Errors are ignored because `Drop` cannot
/// propagate them; the log is append-only, so nothing is lost beyond the
/// final fsync.
impl Drop for Engine {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            if !inner.closed {
                let _ = inner.writer.close();
                inner.closed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests;
