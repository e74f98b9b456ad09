//! # Keydir - DriftKV in-memory key directory
//!
//! Maps every live key to a [`Locator`]: the exact byte range of the key's
//! most recent record on disk. The directory is process-local and never
//! persisted; it is rebuilt from the segment files by replay. Tombstoned or
//! never-written keys are simply absent.

use std::collections::HashMap;
use std::path::PathBuf;

/// Everything needed to find and read one record: which segment file, where
/// the frame starts, how many bytes the frame spans (length prefix included),
/// and the record's timestamp for last-writer-wins resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    /// Segment file holding the record.
    pub path: PathBuf,
    /// Byte offset of the record's 8-byte length prefix within that file.
    pub offset: u64,
    /// Frame size: length prefix plus payload bytes.
    pub total_size: u64,
    /// Timestamp copied from the record.
    pub timestamp: i64,
}

/// The in-memory directory: one entry per live key.
#[derive(Debug, Default)]
pub struct KeyDir {
    map: HashMap<Vec<u8>, Locator>,
}

impl KeyDir {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Returns the locator of the key's most recent record, if the key is live.
    pub fn lookup(&self, key: &[u8]) -> Option<&Locator> {
        self.map.get(key)
    }

    /// Inserts or overwrites the entry for `key`, returning the previous
    /// locator if there was one.
    pub fn insert(&mut self, key: Vec<u8>, locator: Locator) -> Option<Locator> {
        self.map.insert(key, locator)
    }

    /// Removes the entry for `key`, returning its locator if there was one.
    pub fn remove(&mut self, key: &[u8]) -> Option<Locator> {
        self.map.remove(key)
    }

    /// Iterates over all entries. No ordering contract.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Locator)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
