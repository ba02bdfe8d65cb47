//! # Store - EmberKV Storage Core
//!
//! The central orchestrator that ties together the [`mlog`], [`keydir`], and
//! [`cache`] crates into a Bitcask-style append-only key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Caller
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                    STORE                      │
//! │                                               │
//! │ write.rs → grow mapping if needed             │
//! │              → append record (crc|hdr|k|v)    │
//! │              → keydir + cache update          │
//! │                                               │
//! │ read.rs  → cache hit? → done                  │
//! │              → keydir lookup → mapped read    │
//! │              → cache fill                     │
//! │                                               │
//! │ recovery.rs → hint load → scan log tail       │
//! │ hint.rs     → keydir snapshot (tmp + rename)  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module        | Purpose                                              |
//! |---------------|------------------------------------------------------|
//! | `lib.rs`      | `Store` struct, open/close, options, errors, `Drop`  |
//! | `write.rs`    | `put()`, `delete()`, mapping growth policy           |
//! | `read.rs`     | `get()` through cache → keydir → log                 |
//! | `recovery.rs` | hint replay + CRC-verified log scan                  |
//! | `hint.rs`     | sidecar keydir snapshot for fast startup             |
//!
//! ## Crash Safety
//!
//! Every mutation is one self-checksummed record appended to the mapped log;
//! the zero-filled tail terminates the recovery scan. A torn append is caught
//! by CRC verification and surfaces as [`StoreError::CorruptLog`] with the
//! offset of the bad record — everything before it is intact. The hint file
//! is written atomically (temp + rename) and is purely an accelerator: a
//! malformed hint downgrades startup to a full log scan, never to data loss.
//!
//! ## Concurrency
//!
//! Single-writer by contract. Every operation, including `get` (which
//! promotes cache entries), takes `&mut self`; callers wanting parallelism
//! wrap the store themselves.

mod hint;
mod read;
mod recovery;
mod write;

use std::path::{Path, PathBuf};

use cache::LruCache;
use keydir::Keydir;
use mlog::MappedLog;
use thiserror::Error;

pub use keydir::KeydirEntry;
pub use mlog::MlogError;

/// Default initial mapping size (8 KiB).
pub const DEFAULT_INITIAL_LEN: u64 = 8 * 1024;
/// Default hot-value cache capacity in entries.
pub const DEFAULT_CACHE_SIZE: usize = 1024;
/// Default multiplicative mapping growth factor.
pub const DEFAULT_GROWTH_FACTOR: u64 = 2;

/// Result type alias using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by store operations.
///
/// Missing keys are not errors: `get` returns `Ok(None)` and `delete` of an
/// absent key succeeds (appending its tombstone as-if).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A mapped-log access failed (I/O or out-of-bounds).
    #[error(transparent)]
    Log(#[from] MlogError),

    /// CRC mismatch or truncated record during the recovery scan. The log
    /// prefix before `offset` is intact; whether to truncate and continue is
    /// the caller's policy.
    #[error("corrupt log record at offset {offset}")]
    CorruptLog { offset: u64 },

    /// The hint file is truncated mid-record or references bytes beyond the
    /// log. Recovery falls back to a full scan.
    #[error("malformed hint file: {0}")]
    MalformedHint(&'static str),

    /// Key length exceeds the record format's 32-bit size field.
    #[error("key too large: {0} bytes")]
    KeyTooLarge(usize),

    #[error("invalid options: {0}")]
    Config(&'static str),
}

/// Open-time tuning knobs.
#[derive(Debug, Clone)]
pub struct Options {
    /// Initial mapping size in bytes for a fresh log file.
    pub initial_len: u64,
    /// Hot-value cache capacity in entries; zero disables the cache.
    pub cache_size: usize,
    /// Multiplicative growth factor for the mapping, at least 2.
    pub growth_factor: u64,
    /// Flush the mapping to disk after every append.
    pub sync: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            initial_len: DEFAULT_INITIAL_LEN,
            cache_size: DEFAULT_CACHE_SIZE,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            sync: false,
        }
    }
}

/// A Bitcask-style append-only key-value store.
///
/// One memory-mapped log file holds every record ever written; the keydir
/// indexes the newest location of each live key; an LRU cache fronts the log
/// for hot values. See the crate docs for the full data flow.
pub struct Store {
    pub(crate) log: MappedLog,
    pub(crate) keydir: Keydir,
    pub(crate) cache: LruCache,
    /// Absolute append position; everything before it is well-formed records.
    pub(crate) offset: u64,
    pub(crate) growth_factor: u64,
    pub(crate) sync_writes: bool,
    /// Reusable record frame buffer, one allocation across appends.
    pub(crate) scratch: Vec<u8>,
}

impl Store {
    /// Opens (or creates) the log at `path` with an empty keydir and a cold
    /// cache.
    ///
    /// Existing log contents are **not** read here; call [`Store::recover`]
    /// to rebuild the index from the hint file and the log.
    pub fn open<P: AsRef<Path>>(path: P, opts: Options) -> Result<Self> {
        if opts.growth_factor < 2 {
            return Err(StoreError::Config("growth_factor must be at least 2"));
        }
        if opts.initial_len == 0 {
            return Err(StoreError::Config("initial_len must be non-zero"));
        }

        let log = MappedLog::open(path, opts.initial_len)?;
        Ok(Self {
            log,
            keydir: Keydir::new(),
            cache: LruCache::new(opts.cache_size),
            offset: 0,
            growth_factor: opts.growth_factor,
            sync_writes: opts.sync,
            scratch: Vec::with_capacity(256),
        })
    }

    /// Current append position in bytes.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.keydir.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keydir.is_empty()
    }

    /// Whether `key` is live, without touching the cache.
    pub fn contains(&self, key: &str) -> bool {
        self.keydir.contains(key)
    }

    /// Current mapping size in bytes (>= [`Store::offset`]).
    pub fn log_len(&self) -> u64 {
        self.log.len()
    }

    /// Path of the backing log file.
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    /// Path of the sidecar hint file (`<log path>.hint`).
    pub fn hint_path(&self) -> PathBuf {
        hint::hint_path(self.log.path())
    }

    /// Flushes the mapping to disk.
    pub fn sync(&self) -> Result<()> {
        self.log.sync()?;
        Ok(())
    }

    /// Writes the current keydir to the hint file so the next
    /// [`Store::recover`] can skip most of the log scan.
    pub fn snapshot(&self) -> Result<()> {
        hint::write(&self.keydir, &self.hint_path())
    }

    /// Flushes the mapping and snapshots the keydir, then releases the
    /// mapping.
    pub fn close(self) -> Result<()> {
        self.sync()?;
        self.snapshot()?;
        Ok(())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.log.path())
            .field("offset", &self.offset)
            .field("log_len", &self.log.len())
            .field("keys", &self.keydir.len())
            .field("cached", &self.cache.len())
            .field("growth_factor", &self.growth_factor)
            .field("sync", &self.sync_writes)
            .finish()
    }
}

/// Best-effort flush on drop.
///
/// Errors are ignored because `Drop` cannot propagate them; data appended
/// without `sync` may still be in the page cache, exactly as during normal
/// operation. [`Store::close`] is the explicit, checked path.
impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.log.sync();
    }
}

#[cfg(test)]
mod tests;
