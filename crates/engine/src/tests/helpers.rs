use std::fs;
use std::path::Path;

use codec::Record;

pub fn count_data_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "data")
                .unwrap_or(false)
        })
        .count()
}

/// Writes a segment file by hand, with fully controlled timestamps.
/// `records` is `(key, value, timestamp, tombstone)`.
pub fn write_raw_segment(path: &Path, records: &[(&[u8], &[u8], i64, bool)]) {
    let mut data = Vec::new();
    for (key, value, timestamp, tombstone) in records {
        let record = Record {
            crc: codec::checksum(key, value),
            timestamp: *timestamp,
            key: key.to_vec(),
            value: value.to_vec(),
            tombstone: *tombstone,
        };
        let payload = record.encode();
        data.extend_from_slice(&(payload.len() as u64).to_be_bytes());
        data.extend_from_slice(&payload);
    }
    fs::write(path, data).unwrap();
}
