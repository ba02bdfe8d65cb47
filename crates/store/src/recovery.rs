//! Cold-start recovery: hint replay followed by a CRC-verified log scan.
//!
//! The hint file, when present and well-formed, restores the bulk of the
//! keydir without touching the log; the scan then absorbs whatever was
//! appended after the snapshot. With no hint (or a malformed one) the scan
//! covers the whole log from offset zero.

use keydir::{Keydir, KeydirEntry};
use mlog::record;

use crate::{hint, Result, Store, StoreError};

impl Store {
    /// Rebuilds the keydir and append offset from persisted state.
    ///
    /// 1. If `<log>.hint` exists, load it: the keydir is populated from the
    ///    snapshot and the scan start advances to the end of the newest
    ///    snapshotted record. A malformed hint is logged and ignored.
    /// 2. Scan the log from there to the zero sentinel, replaying every
    ///    record (tombstones remove, values insert).
    ///
    /// Idempotent on an already-recovered store: the scan starts on the
    /// sentinel and finds nothing new.
    ///
    /// # Errors
    ///
    /// [`StoreError::CorruptLog`] on the first record whose CRC does not
    /// match or which runs past the mapping; the keydir then reflects
    /// exactly the records before the bad offset.
    pub fn recover(&mut self) -> Result<()> {
        let hint_path = self.hint_path();
        if hint_path.exists() {
            match hint::read(&hint_path, self.log.len()) {
                Ok((keydir, offset)) => {
                    tracing::debug!(keys = keydir.len(), offset, "loaded hint snapshot");
                    self.keydir = keydir;
                    self.offset = offset;
                }
                Err(StoreError::MalformedHint(reason)) => {
                    tracing::warn!(
                        path = %hint_path.display(),
                        reason,
                        "ignoring malformed hint file, falling back to full log scan"
                    );
                    self.keydir = Keydir::new();
                    self.offset = 0;
                }
                Err(e) => return Err(e),
            }
        }

        self.scan_log()?;
        // entries may have been superseded since the cache was filled
        self.cache.clear();

        tracing::debug!(
            keys = self.keydir.len(),
            offset = self.offset,
            "recovery complete"
        );
        Ok(())
    }

    /// Replays log records from the current offset until the zero sentinel
    /// or the end of the mapping.
    fn scan_log(&mut self) -> Result<()> {
        loop {
            // the zero-filled tail may be shorter than a sentinel word
            if self.offset + record::CRC_LEN > self.log.len() {
                break;
            }
            if self.log.get_u64(self.offset)? == 0 {
                break;
            }

            if self.offset + record::RECORD_OVERHEAD > self.log.len() {
                return Err(StoreError::CorruptLog {
                    offset: self.offset,
                });
            }
            let header = record::decode_header(&self.log, self.offset)?;
            let record_len = header.record_len();
            match self.offset.checked_add(record_len) {
                Some(end) if end <= self.log.len() => {}
                _ => {
                    return Err(StoreError::CorruptLog {
                        offset: self.offset,
                    })
                }
            }
            if !record::verify(&self.log, self.offset, &header)? {
                return Err(StoreError::CorruptLog {
                    offset: self.offset,
                });
            }

            let key_bytes = self
                .log
                .get_bytes(self.offset + record::RECORD_OVERHEAD, header.key_size as u64)?;
            let key = match std::str::from_utf8(key_bytes) {
                Ok(s) => s.to_string(),
                Err(_) => {
                    return Err(StoreError::CorruptLog {
                        offset: self.offset,
                    })
                }
            };

            if header.value_size == 0 {
                self.keydir.remove(&key);
            } else {
                self.keydir.insert(
                    key,
                    KeydirEntry {
                        ts: header.ts,
                        value_size: header.value_size,
                        value_offset: header.value_offset(self.offset),
                    },
                );
            }

            self.offset += record_len;
        }
        Ok(())
    }
}
