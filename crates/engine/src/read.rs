/// Read path: `get()`.
///
/// A lookup resolves entirely through the key directory: either the key has
/// a locator (one positional read plus a decode away from its value) or it
/// does not exist. The decode re-verifies the record's CRC and that the
/// record actually belongs to the requested key, so a stale or corrupted
/// locator surfaces as corruption instead of a wrong answer.
use crate::{Engine, Error, Result};

impl Engine {
    /// Looks up a key, returning its current value.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the key is absent from the directory,
    /// [`Error::Deleted`] when the located record is a tombstone,
    /// [`Error::Corrupt`] when the record fails validation, and
    /// [`Error::Io`] on filesystem failure.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let mut inner = self.lock()?;
        inner.check_open()?;

        let locator = match inner.keydir.lookup(key) {
            Some(locator) => locator.clone(),
            None => return Err(Error::NotFound),
        };

        let payload = inner
            .reader
            .read_frame(&locator.path, locator.offset, locator.total_size)?;
        let record = codec::decode(&payload)
            .map_err(|e| Error::corrupt(&locator.path, locator.offset, e))?;

        if record.key != key {
            return Err(Error::corrupt(
                &locator.path,
                locator.offset,
                "record key does not match directory entry",
            ));
        }
        if record.tombstone {
            return Err(Error::Deleted);
        }
        Ok(record.value)
    }
}
