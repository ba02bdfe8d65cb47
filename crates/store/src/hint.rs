//! # Hint File - Keydir Snapshot
//!
//! A compact, sequential serialisation of the keydir that replays much
//! faster than scanning the log. One record per live key:
//!
//! ```text
//! [ts: i64][key_size: i32][value_size: i64][value_offset: i64][key bytes]
//! ```
//!
//! Integers are big-endian (portable fixed-width stream writes, unlike the
//! log's native-order records). There is no framing beyond the record length
//! itself; the file ends at EOF.
//!
//! ## Crash Safety
//!
//! The snapshot is written to `<hint>.tmp`, flushed, fsynced, and renamed
//! over the previous hint, so a crash mid-snapshot leaves the old hint
//! intact. A hint that is nonetheless truncated mid-record, or whose entries
//! point past the end of the log, decodes to [`StoreError::MalformedHint`]
//! and recovery falls back to a full log scan.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use keydir::{Keydir, KeydirEntry};

use crate::{Result, StoreError};

/// Sidecar path for the log at `log_path`: the same name with `.hint`
/// appended (so `data.log` pairs with `data.log.hint`).
pub(crate) fn hint_path(log_path: &Path) -> PathBuf {
    let mut os: OsString = log_path.as_os_str().to_os_string();
    os.push(".hint");
    PathBuf::from(os)
}

fn tmp_path(hint_path: &Path) -> PathBuf {
    let mut os: OsString = hint_path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Serialises the keydir to `path`, atomically replacing any previous hint.
pub(crate) fn write(keydir: &Keydir, path: &Path) -> Result<()> {
    let tmp = tmp_path(path);

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    let mut w = BufWriter::new(file);

    for (key, entry) in keydir.iter() {
        w.write_i64::<BigEndian>(entry.ts)?;
        w.write_i32::<BigEndian>(key.len() as i32)?;
        w.write_i64::<BigEndian>(entry.value_size as i64)?;
        w.write_i64::<BigEndian>(entry.value_offset as i64)?;
        w.write_all(key.as_bytes())?;
    }

    w.flush()?;
    w.get_ref().sync_all()?;
    drop(w);

    fs::rename(&tmp, path)?;
    Ok(())
}

/// Distinguishes a truncated record from an I/O failure: EOF inside a record
/// is a malformed hint, anything else propagates.
fn field<T>(res: io::Result<T>) -> Result<T> {
    res.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            StoreError::MalformedHint("truncated mid-record")
        } else {
            StoreError::Io(e)
        }
    })
}

/// Reads a hint file back into a fresh keydir.
///
/// Returns the keydir and the scan-start offset: the maximum
/// `value_offset + value_size` across all entries, which is the end of the
/// newest record the snapshot knows about. Entries that do not fit inside
/// `log_len` mean the hint belongs to a different (or truncated) log and the
/// whole file is rejected as malformed.
pub(crate) fn read(path: &Path, log_len: u64) -> Result<(Keydir, u64)> {
    let file = File::open(path)?;
    let mut r = BufReader::new(file);

    let mut keydir = Keydir::new();
    let mut offset = 0u64;

    loop {
        // EOF at a record boundary is the normal terminator
        let ts = match r.read_i64::<BigEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };

        let key_size = field(r.read_i32::<BigEndian>())?;
        let value_size = field(r.read_i64::<BigEndian>())?;
        let value_offset = field(r.read_i64::<BigEndian>())?;

        if key_size < 0 {
            return Err(StoreError::MalformedHint("negative key size"));
        }
        if value_size <= 0 {
            return Err(StoreError::MalformedHint("non-positive value size"));
        }
        if value_offset < 0 {
            return Err(StoreError::MalformedHint("negative value offset"));
        }

        let mut key_bytes = vec![0u8; key_size as usize];
        field(r.read_exact(&mut key_bytes))?;
        let key = String::from_utf8(key_bytes)
            .map_err(|_| StoreError::MalformedHint("key is not UTF-8"))?;

        let (value_size, value_offset) = (value_size as u64, value_offset as u64);
        let end = match value_offset.checked_add(value_size) {
            Some(end) if end <= log_len => end,
            _ => return Err(StoreError::MalformedHint("entry points past end of log")),
        };

        keydir.insert(
            key,
            KeydirEntry {
                ts,
                value_size,
                value_offset,
            },
        );
        offset = offset.max(end);
    }

    Ok((keydir, offset))
}
