use super::helpers::count_data_files;
use crate::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

// --------------------- Size cap triggers rollover ---------------------

#[test]
fn small_cap_produces_multiple_segments() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open_with(dir.path(), Config::new().max_file_size(200))?;

    // Each record frames to well over half the cap, so at least one
    // rollover must happen across ten puts.
    for i in 0..10u32 {
        engine.put(format!("key{}", i).into_bytes(), vec![b'x'; 20])?;
    }

    assert!(
        count_data_files(dir.path()) >= 2,
        "expected at least 2 segments, found {}",
        count_data_files(dir.path())
    );

    // Every key stays readable across the rollovers.
    for i in 0..10u32 {
        assert_eq!(engine.get(format!("key{}", i).as_bytes())?, vec![b'x'; 20]);
    }
    Ok(())
}

#[test]
fn no_rollover_under_cap() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open(dir.path())?; // default 1 MiB cap

    for i in 0..100u32 {
        engine.put(format!("k{}", i).into_bytes(), b"small".to_vec())?;
    }
    assert_eq!(count_data_files(dir.path()), 1);
    Ok(())
}

#[test]
fn active_path_changes_on_rollover() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open_with(dir.path(), Config::new().max_file_size(64))?;

    engine.put(b"a".to_vec(), vec![b'1'; 40])?;
    let before = engine.active_segment_path()?.unwrap();

    engine.put(b"b".to_vec(), vec![b'2'; 40])?;
    let after = engine.active_segment_path()?.unwrap();

    assert_ne!(before, after);
    Ok(())
}

// --------------------- Filename discipline ---------------------

#[test]
fn segment_names_increase_under_rapid_rollover() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open_with(dir.path(), Config::new().max_file_size(32))?;

    // Every put rolls over; all within the same wall-clock second.
    for i in 0..8u32 {
        engine.put(format!("k{}", i).into_bytes(), vec![b'v'; 32])?;
    }

    let mut stamps: Vec<i64> = fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            e.path()
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
        })
        .collect();
    stamps.sort_unstable();

    assert!(stamps.len() >= 8);
    for pair in stamps.windows(2) {
        assert!(pair[0] < pair[1], "duplicate or reordered stamp: {stamps:?}");
    }
    Ok(())
}

#[test]
fn oversized_record_still_lands() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open_with(dir.path(), Config::new().max_file_size(100))?;

    // A single record bigger than the whole cap must still be written.
    let value = vec![b'z'; 500];
    engine.put(b"huge".to_vec(), value.clone())?;
    assert_eq!(engine.get(b"huge")?, value);
    Ok(())
}

#[test]
fn overwrites_across_rollovers_keep_newest() -> Result<()> {
    let dir = tempdir()?;
    let engine = Engine::open_with(dir.path(), Config::new().max_file_size(64))?;

    for i in 0..10u32 {
        engine.put(b"shared".to_vec(), format!("v{:02}", i).into_bytes())?;
        engine.put(format!("pad{}", i).into_bytes(), vec![b'p'; 40])?;
    }
    assert_eq!(engine.get(b"shared")?, b"v09".to_vec());
    Ok(())
}
