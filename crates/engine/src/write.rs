/// Write path: `put()`, `delete()`, `sync()`, and `close()`.
///
/// All mutations flow through this module. Each one is encoded, appended to
/// the active segment (rolling over when the size cap would be exceeded),
/// and only then reflected in the key directory; a failed append leaves the
/// directory untouched. The prior record of an overwritten key stays on disk
/// as dead space, shadowed by the new directory entry.
use std::io;

use codec::Record;
use keydir::Locator;
use segment::FRAME_HEADER_BYTES;

use crate::{Engine, Error, Result};

impl Engine {
    /// Inserts or overwrites a key-value pair.
    ///
    /// The record is durably appended (subject to the configured fsync
    /// policy) and the directory entry points at it afterwards.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        ensure_encodable(&key, &value)?;

        let mut inner = self.lock()?;
        inner.check_open()?;

        let record = Record::new(key, value);
        let payload = record.encode();
        let offset = inner.writer.append(&payload)?;
        let path = match inner.writer.active_path() {
            Some(path) => path.to_path_buf(),
            None => return Err(Error::Closed),
        };

        let locator = Locator {
            path,
            offset,
            total_size: FRAME_HEADER_BYTES + payload.len() as u64,
            timestamp: record.timestamp,
        };
        inner.keydir.insert(record.key, locator);
        Ok(())
    }

    /// Deletes a key by appending a tombstone and dropping its directory
    /// entry.
    ///
    /// Deleting a key that is not currently indexed fails with
    /// [`Error::NotFound`]; it is an error, not a no-op. The tombstone hits
    /// the log regardless of what earlier segments contain, so a later
    /// replay cannot resurrect the key from older records.
    pub fn delete(&self, key: Vec<u8>) -> Result<()> {
        ensure_encodable(&key, &[])?;

        let mut inner = self.lock()?;
        inner.check_open()?;

        if inner.keydir.lookup(&key).is_none() {
            return Err(Error::NotFound);
        }

        let record = Record::tombstone(key);
        let payload = record.encode();
        inner.writer.append(&payload)?;
        inner.keydir.remove(&record.key);
        Ok(())
    }

    /// Flushes the active segment to disk.
    pub fn sync(&self) -> Result<()> {
        let mut inner = self.lock()?;
        inner.check_open()?;
        inner.writer.sync()?;
        Ok(())
    }

    /// Closes the active segment and renders the engine unusable.
    ///
    /// Idempotent; every subsequent operation fails with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.closed {
            return Ok(());
        }
        inner.writer.close()?;
        inner.closed = true;
        Ok(())
    }
}

/// The codec stores key and value sizes as u32; larger inputs cannot be
/// represented on disk.
fn ensure_encodable(key: &[u8], value: &[u8]) -> Result<()> {
    if key.len() as u64 > u32::MAX as u64 || value.len() as u64 > u32::MAX as u64 {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "key or value exceeds the u32 size field",
        )));
    }
    Ok(())
}
