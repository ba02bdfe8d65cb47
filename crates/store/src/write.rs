//! Write path: `put()`, `delete()`, and the mapping growth policy.
//!
//! Every mutation appends one record to the mapped log, then updates the
//! keydir and the cache. The record is framed into a reusable scratch buffer
//! and lands in the mapping with a single positional write; nothing before
//! the current append offset is ever touched.

use std::time::{SystemTime, UNIX_EPOCH};

use keydir::KeydirEntry;
use mlog::record;

use crate::{Result, Store, StoreError};

/// Wall-clock milliseconds since the Unix epoch.
///
/// Two writes of the same key may share a timestamp; log order breaks the
/// tie (the later offset wins).
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl Store {
    /// Inserts or replaces the value for `key`.
    ///
    /// An empty `value` is legal but is the tombstone encoding: the record is
    /// appended and the key becomes unreachable, exactly as with
    /// [`Store::delete`].
    ///
    /// # Errors
    ///
    /// [`StoreError::KeyTooLarge`] if the key exceeds the format's 32-bit
    /// size field; otherwise only I/O failures from growth, the append, or
    /// the optional fsync.
    pub fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let ts = now_ms();
        let (value_offset, record_len) = self.append(ts, key, value)?;

        if value.is_empty() {
            self.keydir.remove(key);
            self.cache.remove(key);
        } else {
            self.keydir.insert(
                key.to_string(),
                KeydirEntry {
                    ts,
                    value_size: value.len() as u64,
                    value_offset,
                },
            );
            self.cache.put(key, value.to_vec());
        }

        self.offset += record_len;
        Ok(())
    }

    /// Appends a tombstone for `key` and drops it from the keydir and cache.
    ///
    /// Deleting an absent key is not an error: the tombstone is appended
    /// all the same, which keeps the operation idempotent in its observable
    /// effect.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let (_, record_len) = self.append(now_ms(), key, &[])?;

        self.keydir.remove(key);
        self.cache.remove(key);

        self.offset += record_len;
        Ok(())
    }

    /// Frames and writes one record at the current append offset, growing
    /// the mapping first if it is too small. Returns the absolute value
    /// offset and the record length; the caller advances `self.offset` only
    /// after the index update so a failed append leaves the store untouched.
    fn append(&mut self, ts: i64, key: &str, value: &[u8]) -> Result<(u64, u64)> {
        if key.len() > u32::MAX as usize {
            return Err(StoreError::KeyTooLarge(key.len()));
        }

        let record_len = record::RECORD_OVERHEAD + key.len() as u64 + value.len() as u64;
        self.grow_if_needed(record_len)?;

        record::encode_into(&mut self.scratch, ts, key.as_bytes(), value);
        self.log.put_bytes(self.offset, &self.scratch)?;
        if self.sync_writes {
            self.log.sync()?;
        }

        let value_offset = self.offset + record::RECORD_OVERHEAD + key.len() as u64;
        Ok((value_offset, record_len))
    }

    /// Ensures the mapping can hold `n` more bytes at the append offset,
    /// multiplying its size by the growth factor until it can. Doubling (or
    /// more) keeps the per-byte cost of growth amortised O(1).
    fn grow_if_needed(&mut self, n: u64) -> Result<()> {
        let mut target = self.log.len();
        while self.offset + n > target {
            target = target.saturating_mul(self.growth_factor);
        }
        if target > self.log.len() {
            tracing::debug!(from = self.log.len(), to = target, "growing log mapping");
            self.log.remap(target)?;
        }
        Ok(())
    }
}
