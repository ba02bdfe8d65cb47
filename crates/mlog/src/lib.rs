//! # mlog — Memory-Mapped Append Log
//!
//! The durability primitive of the EmberKV storage engine: a single backing
//! file exposed as a byte-addressable window through `mmap`.
//!
//! [`MappedLog`] owns the file handle and the mapping and provides positional
//! reads and writes of fixed-width integers and byte ranges, CRC-32 over an
//! arbitrary window, and on-demand growth via [`MappedLog::remap`]. The file
//! is always zero-filled past the last written record, which the store's
//! recovery scanner relies on: an all-zero checksum word marks end-of-data.
//!
//! All multi-byte integers use **native byte order** — the log is not
//! portable across architectures of different endianness.
//!
//! ## Growth
//!
//! `remap(new_len)` extends (or truncates) the file with `set_len`, which
//! zero-fills the new tail, and then replaces the mapping with a fresh one.
//! Any slice previously handed out by `get_bytes` must not be held across a
//! remap; the store serialises remaps with reads and writes, so the borrow
//! checker enforces this within one `Store`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mlog::MappedLog;
//!
//! let mut log = MappedLog::open("data.emberlog", 8 * 1024).unwrap();
//! log.put_u64(0, 0xfeed_beef).unwrap();
//! assert_eq!(log.get_u64(0).unwrap(), 0xfeed_beef);
//! ```

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use thiserror::Error;

pub mod record;

/// Errors that can occur during mapped-log operations.
#[derive(Debug, Error)]
pub enum MlogError {
    /// An underlying file or mmap system call failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An access would fall outside the current mapping.
    #[error("access of {len} bytes at offset {offset} exceeds mapping of {mapped} bytes")]
    OutOfBounds { offset: u64, len: u64, mapped: u64 },
}

/// A file and a writable memory mapping over its full length.
///
/// The log exclusively owns its file handle and mapping for the lifetime of
/// the value. Reads and writes are positional; there is no cursor.
pub struct MappedLog {
    file: File,
    path: PathBuf,
    map: MmapMut,
}

impl MappedLog {
    /// Opens (or creates) the backing file, extends it to
    /// `max(existing_length, initial_len)` bytes, and maps the full file.
    ///
    /// A freshly created file is zero-filled by the extension. `initial_len`
    /// must be non-zero: an empty file cannot be mapped.
    pub fn open<P: AsRef<Path>>(path: P, initial_len: u64) -> Result<Self, MlogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        let existing = file.metadata()?.len();
        let len = existing.max(initial_len);
        if len > existing {
            file.set_len(len)?;
        }

        let map = unsafe { MmapOptions::new().map_mut(&file)? };
        Ok(Self { file, path, map })
    }

    /// Resizes the file to `new_len` bytes and replaces the mapping.
    ///
    /// Extension zero-fills the new tail. The old mapping is released when
    /// the new one takes its place; callers must not hold slices from before
    /// the remap.
    pub fn remap(&mut self, new_len: u64) -> Result<(), MlogError> {
        self.map.flush()?;
        self.file.set_len(new_len)?;
        self.map = unsafe { MmapOptions::new().map_mut(&self.file)? };
        Ok(())
    }

    /// Current mapping size in bytes (equals the file length).
    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes the mapping to disk (`msync`).
    pub fn sync(&self) -> Result<(), MlogError> {
        self.map.flush()?;
        Ok(())
    }

    /// Bounds-checks `[offset, offset + len)` against the mapping.
    fn check(&self, offset: u64, len: u64) -> Result<usize, MlogError> {
        let mapped = self.len();
        match offset.checked_add(len) {
            Some(end) if end <= mapped => Ok(offset as usize),
            _ => Err(MlogError::OutOfBounds {
                offset,
                len,
                mapped,
            }),
        }
    }

    /// Returns the `len` bytes starting at `offset`.
    ///
    /// The slice borrows the mapping; it is invalidated by [`remap`].
    ///
    /// [`remap`]: MappedLog::remap
    pub fn get_bytes(&self, offset: u64, len: u64) -> Result<&[u8], MlogError> {
        let start = self.check(offset, len)?;
        Ok(&self.map[start..start + len as usize])
    }

    /// Writes `bytes` at `offset`.
    pub fn put_bytes(&mut self, offset: u64, bytes: &[u8]) -> Result<(), MlogError> {
        let start = self.check(offset, bytes.len() as u64)?;
        self.map[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn get_u64(&self, offset: u64) -> Result<u64, MlogError> {
        let b = self.get_bytes(offset, 8)?;
        Ok(u64::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn get_i64(&self, offset: u64) -> Result<i64, MlogError> {
        let b = self.get_bytes(offset, 8)?;
        Ok(i64::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn get_u32(&self, offset: u64) -> Result<u32, MlogError> {
        let b = self.get_bytes(offset, 4)?;
        Ok(u32::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn get_i32(&self, offset: u64) -> Result<i32, MlogError> {
        let b = self.get_bytes(offset, 4)?;
        Ok(i32::from_ne_bytes(b.try_into().unwrap()))
    }

    pub fn put_u64(&mut self, offset: u64, value: u64) -> Result<(), MlogError> {
        self.put_bytes(offset, &value.to_ne_bytes())
    }

    pub fn put_i64(&mut self, offset: u64, value: i64) -> Result<(), MlogError> {
        self.put_bytes(offset, &value.to_ne_bytes())
    }

    /// CRC-32 (IEEE 802.3) over the `len` bytes starting at `offset`.
    pub fn crc32(&self, offset: u64, len: u64) -> Result<u32, MlogError> {
        Ok(crc32fast::hash(self.get_bytes(offset, len)?))
    }
}

impl std::fmt::Debug for MappedLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedLog")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}
