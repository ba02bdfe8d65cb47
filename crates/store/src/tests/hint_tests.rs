use super::helpers::open_store;
use anyhow::Result;
use byteorder::{BigEndian, WriteBytesExt};
use std::fs::{self, OpenOptions};
use std::io::Write;
use tempfile::tempdir;

// --------------------- Snapshot & reload ---------------------

#[test]
fn snapshot_restores_keydir_and_offset() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let (pre_len, pre_offset);
    {
        let mut store = open_store(&path);
        store.put("a", b"alpha")?;
        store.put("b", b"beta")?;
        store.snapshot()?;
        pre_len = store.len();
        pre_offset = store.offset();
    }

    let mut store = open_store(&path);
    store.recover()?;

    assert_eq!(store.len(), pre_len);
    assert_eq!(store.offset(), pre_offset);
    assert_eq!(store.get("a")?, Some(b"alpha".to_vec()));
    assert_eq!(store.get("b")?, Some(b"beta".to_vec()));
    Ok(())
}

#[test]
fn writes_after_snapshot_are_absorbed_by_the_scan() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let pre_offset;
    {
        let mut store = open_store(&path);
        store.put("x", b"v")?;
        store.snapshot()?;
        store.put("y", b"w")?;
        pre_offset = store.offset();
    }

    let mut store = open_store(&path);
    store.recover()?;

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("x")?, Some(b"v".to_vec()));
    assert_eq!(store.get("y")?, Some(b"w".to_vec()));
    assert_eq!(store.offset(), pre_offset);
    Ok(())
}

#[test]
fn trailing_tombstone_after_snapshot_is_replayed() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let pre_offset;
    {
        let mut store = open_store(&path);
        store.put("a", b"1")?;
        store.put("b", b"2")?;
        store.delete("b")?;
        store.snapshot()?;
        pre_offset = store.offset();
    }

    // the hint only knows "a"; the scan must still walk past b's records
    // to land on the true append position
    let mut store = open_store(&path);
    store.recover()?;

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("b")?, None);
    assert_eq!(store.offset(), pre_offset);
    Ok(())
}

#[test]
fn close_writes_the_hint() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let hint_path;
    {
        let mut store = open_store(&path);
        store.put("k", b"v")?;
        hint_path = store.hint_path();
        store.close()?;
    }

    assert!(hint_path.exists());
    let mut store = open_store(&path);
    store.recover()?;
    assert_eq!(store.get("k")?, Some(b"v".to_vec()));
    Ok(())
}

#[test]
fn snapshot_replaces_previous_hint_atomically() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let mut store = open_store(&path);
    store.put("a", b"1")?;
    store.snapshot()?;
    let first_len = fs::metadata(store.hint_path())?.len();

    store.put("bb", b"22")?;
    store.snapshot()?;

    assert!(fs::metadata(store.hint_path())?.len() > first_len);
    // no temp file left behind
    let tmp: std::path::PathBuf = {
        let mut os = store.hint_path().into_os_string();
        os.push(".tmp");
        os.into()
    };
    assert!(!tmp.exists());
    Ok(())
}

#[test]
fn empty_store_snapshot_is_an_empty_hint() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let mut store = open_store(&path);
    store.snapshot()?;
    assert_eq!(fs::metadata(store.hint_path())?.len(), 0);

    store.recover()?;
    assert!(store.is_empty());
    assert_eq!(store.offset(), 0);
    Ok(())
}

// --------------------- Malformed hint fallback ---------------------

#[test]
fn truncated_hint_falls_back_to_full_scan() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let hint_path;
    {
        let mut store = open_store(&path);
        store.put("a", b"alpha")?;
        store.put("b", b"beta")?;
        hint_path = store.hint_path();
        store.close()?;
    }

    // chop the hint mid-record
    let data = fs::read(&hint_path)?;
    fs::write(&hint_path, &data[..data.len() - 3])?;

    let mut store = open_store(&path);
    store.recover()?;

    assert_eq!(store.len(), 2);
    assert_eq!(store.get("a")?, Some(b"alpha".to_vec()));
    assert_eq!(store.get("b")?, Some(b"beta".to_vec()));
    Ok(())
}

#[test]
fn hint_pointing_past_the_log_falls_back_to_full_scan() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("log");

    let hint_path;
    {
        let mut store = open_store(&path);
        store.put("real", b"value")?;
        hint_path = store.hint_path();
    }

    // hand-craft a hint whose entry lands far beyond the mapping
    {
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&hint_path)?;
        f.write_i64::<BigEndian>(0)?; // ts
        f.write_i32::<BigEndian>(1)?; // key_size
        f.write_i64::<BigEndian>(8)?; // value_size
        f.write_i64::<BigEndian>(1 << 40)?; // value_offset, way past EOF
        f.write_all(b"x")?;
    }

    let mut store = open_store(&path);
    store.recover()?;

    // the bogus hint was discarded; the scan found the real record
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("real")?, Some(b"value".to_vec()));
    assert!(!store.contains("x"));
    Ok(())
}
