/// Segment replay and index reconstruction.
///
/// This module handles the cold-start path: enumerating the segment files of
/// a data directory, replaying every framed record in temporal order, and
/// resolving last-writer-wins into a fresh key directory.
use std::fs;
use std::path::{Path, PathBuf};

use codec::Record;
use keydir::{KeyDir, Locator};
use segment::Frame;

use crate::{Engine, Error, Result};

impl Engine {
    /// Reconstructs the key directory from the on-disk segment files.
    ///
    /// Segments are replayed oldest-first (numeric filename order); within
    /// that order a record wins over an existing entry when its timestamp is
    /// greater **or equal**, so the last physical write takes ties, matching
    /// what the live write path would have produced. Tombstones remove their
    /// key.
    ///
    /// The rebuild happens aside and is swapped in only on success: a failed
    /// rebuild leaves the current in-memory directory untouched.
    ///
    /// # Errors
    ///
    /// [`Error::Corrupt`] when a fully-present record fails to decode (a
    /// truncated trailing frame left by a crash is tolerated and logged
    /// instead), [`Error::Io`] on filesystem failure.
    pub fn build_index(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check_open()?;

        let files = data_files(&self.dir)?;
        let mut fresh = KeyDir::new();

        for path in &files {
            tracing::debug!(file = %path.display(), "replaying segment");
            for frame in segment::scan(path)? {
                let frame = frame?;
                let record = codec::decode(&frame.payload)
                    .map_err(|e| Error::corrupt(path, frame.offset, e))?;
                apply_record(&mut fresh, path, &frame, record);
            }
        }

        tracing::info!(
            segments = files.len(),
            keys = fresh.len(),
            "key directory rebuilt"
        );
        inner.keydir = fresh;
        Ok(())
    }
}

/// Folds one replayed record into the directory under last-writer-wins.
fn apply_record(keydir: &mut KeyDir, path: &Path, frame: &Frame, record: Record) {
    if let Some(existing) = keydir.lookup(&record.key) {
        // Strictly newer existing entry wins; ties fall through so the
        // later physical write is applied.
        if record.timestamp < existing.timestamp {
            return;
        }
    }

    if record.tombstone {
        keydir.remove(&record.key);
    } else {
        let locator = Locator {
            path: path.to_path_buf(),
            offset: frame.offset,
            total_size: frame.total_size,
            timestamp: record.timestamp,
        };
        keydir.insert(record.key, locator);
    }
}

/// Segment files of `dir` in replay order.
///
/// Regular files named `*.data` are sorted by the numeric value of their
/// stem, ascending. A stem that does not parse as an integer is warned about
/// and ordered lexicographically against its peers.
fn data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{}", segment::DATA_FILE_SUFFIX);
    let mut files: Vec<(PathBuf, String, Option<i64>)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        let Some(stem) = name.strip_suffix(&suffix) else {
            continue;
        };

        let stamp = stem.parse::<i64>().ok();
        if stamp.is_none() {
            tracing::warn!(
                file = %name,
                "segment name is not numeric, falling back to lexicographic order"
            );
        }
        files.push((entry.path(), name, stamp));
    }

    files.sort_by(|a, b| match (a.2, b.2) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.1.cmp(&b.1),
    });

    Ok(files.into_iter().map(|(path, _, _)| path).collect())
}
