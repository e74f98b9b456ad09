//! # Codec - DriftKV record encoding
//!
//! Serializes a single logical record (key, value, timestamp, tombstone flag)
//! into the self-describing binary payload that segment files store, and
//! decodes it back. The framing around the payload (the 8-byte length prefix)
//! is owned by the `segment` crate; this crate only knows about payload bytes.
//!
//! ## Binary Payload Format
//!
//! ```text
//! +-------+---------+---------+---------+------+----------+-----------+
//! |  crc  | tstamp  | key_sz  | val_sz  | tomb |   key    |   value   |
//! |  u32  |  i64    |  u32    |  u32    |  u8  | key_sz B | val_sz B  |
//! +-------+---------+---------+---------+------+----------+-----------+
//! ```
//!
//! All integers big-endian. `crc` is CRC32 (IEEE) over `key || value`.
//! `tstamp` is seconds since the Unix epoch, stamped when the record is
//! constructed. `tomb` is `0x00` for a live record or `0x01` for a tombstone;
//! any other byte is corruption. Tombstones carry an empty value.
//!
//! The layout is fixed for the lifetime of a data directory: segment files
//! written by one codec version must decode under every later one.
//!
//! ## Example
//!
//! ```rust
//! use codec::Record;
//!
//! let record = Record::new(b"hello".to_vec(), b"world".to_vec());
//! let payload = record.encode();
//! let decoded = codec::decode(&payload).unwrap();
//! assert_eq!(decoded, record);
//! ```

use byteorder::{BigEndian, ReadBytesExt};
use crc32fast::Hasher as Crc32;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Size of the fixed header that precedes the key and value bytes:
/// crc (4) + timestamp (8) + key_size (4) + value_size (4) + tombstone (1).
pub const RECORD_HEADER_BYTES: usize = 21;

/// Errors produced while decoding a record payload. Every variant means the
/// payload cannot be trusted; callers treat them all as corruption.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The buffer ended before the fixed header could be read.
    #[error("record truncated: {len} bytes, header needs {RECORD_HEADER_BYTES}")]
    Truncated { len: usize },

    /// The sizes declared in the header disagree with the buffer length.
    #[error("record length mismatch: header declares {declared} bytes, buffer has {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    /// The tombstone flag byte was neither `0x00` nor `0x01`.
    #[error("unrecognized tombstone flag byte {0:#04x}")]
    BadTombstoneFlag(u8),

    /// The stored CRC does not match the CRC recomputed over `key || value`.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },
}

/// A single logical record as it exists in a segment file.
///
/// Records are immutable once written: a `put` produces a live record, a
/// `delete` produces a tombstone with an empty value. The `crc` covers the
/// concatenation of key and value bytes and is verified on every decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// CRC32 (IEEE) over `key || value`.
    pub crc: u32,
    /// Seconds since the Unix epoch, stamped at construction.
    pub timestamp: i64,
    /// The lookup key.
    pub key: Vec<u8>,
    /// The payload value; empty for tombstones.
    pub value: Vec<u8>,
    /// `true` when this record marks the key as deleted.
    pub tombstone: bool,
}

impl Record {
    /// Creates a live record for `key` / `value`, stamping the current
    /// wall-clock time and computing the CRC.
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            crc: checksum(&key, &value),
            timestamp: unix_seconds(),
            key,
            value,
            tombstone: false,
        }
    }

    /// Creates a tombstone for `key` (empty value), stamping the current
    /// wall-clock time.
    pub fn tombstone(key: Vec<u8>) -> Self {
        Self {
            crc: checksum(&key, &[]),
            timestamp: unix_seconds(),
            key,
            value: Vec::new(),
            tombstone: true,
        }
    }

    /// Key length as stored in the header.
    pub fn key_size(&self) -> u32 {
        self.key.len() as u32
    }

    /// Value length as stored in the header.
    pub fn value_size(&self) -> u32 {
        self.value.len() as u32
    }

    /// Serializes the record into its binary payload.
    ///
    /// The output fully round-trips through [`decode`]. Allocation is the
    /// only possible failure and is left to the allocator.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf =
            Vec::with_capacity(RECORD_HEADER_BYTES + self.key.len() + self.value.len());
        buf.extend_from_slice(&self.crc.to_be_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        buf.extend_from_slice(&(self.key.len() as u32).to_be_bytes());
        buf.extend_from_slice(&(self.value.len() as u32).to_be_bytes());
        buf.push(self.tombstone as u8);
        buf.extend_from_slice(&self.key);
        buf.extend_from_slice(&self.value);
        buf
    }
}

/// Computes the CRC32 (IEEE) checksum over `key || value`.
pub fn checksum(key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

/// Decodes a binary payload back into a [`Record`]. Inverse of
/// [`Record::encode`].
///
/// Validates the declared sizes against the buffer length, the tombstone
/// flag byte, and the stored CRC against a recomputation over
/// `key || value`. Any inconsistency is corruption.
pub fn decode(buf: &[u8]) -> Result<Record, CodecError> {
    let truncated = || CodecError::Truncated { len: buf.len() };

    let mut rdr = buf;
    let crc = rdr.read_u32::<BigEndian>().map_err(|_| truncated())?;
    let timestamp = rdr.read_i64::<BigEndian>().map_err(|_| truncated())?;
    let key_size = rdr.read_u32::<BigEndian>().map_err(|_| truncated())? as usize;
    let value_size = rdr.read_u32::<BigEndian>().map_err(|_| truncated())? as usize;
    let tombstone = match rdr.read_u8().map_err(|_| truncated())? {
        0 => false,
        1 => true,
        flag => return Err(CodecError::BadTombstoneFlag(flag)),
    };

    // u64 arithmetic so absurd declared sizes cannot wrap on 32-bit targets
    let declared = RECORD_HEADER_BYTES as u64 + key_size as u64 + value_size as u64;
    if buf.len() as u64 != declared {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: buf.len() as u64,
        });
    }

    let key = buf[RECORD_HEADER_BYTES..RECORD_HEADER_BYTES + key_size].to_vec();
    let value = buf[RECORD_HEADER_BYTES + key_size..].to_vec();

    let computed = checksum(&key, &value);
    if computed != crc {
        return Err(CodecError::ChecksumMismatch {
            stored: crc,
            computed,
        });
    }

    Ok(Record {
        crc,
        timestamp,
        key,
        value,
        tombstone,
    })
}

/// Current wall-clock time in whole seconds since the Unix epoch.
/// A clock set before the epoch stamps 0.
fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() as i64)
}
