//! Append-log record codec.
//!
//! Every mutation of the store is one record appended to the mapped log:
//!
//! ```text
//! [crc: u64][ts: i64][key_size: u32][value_size: u64][key bytes][value bytes]
//! ```
//!
//! All integers are native byte order. The checksum word stores the CRC-32 of
//! `header ++ key ++ value` widened to 64 bits, so its upper half is always
//! zero; readers mask it back to 32 bits before comparing. `value_size == 0`
//! marks the record as a tombstone.
//!
//! An all-zero checksum word is never produced for the crc of a record by
//! this codec's writer path alone — the log's zero-filled tail doubles as the
//! end-of-data sentinel, and the recovery scanner stops at the first zero
//! word.

use crate::{MappedLog, MlogError};

/// Width of the on-log checksum word.
pub const CRC_LEN: u64 = 8;

/// Width of the `ts | key_size | value_size` header.
pub const HEADER_LEN: u64 = 20;

/// Fixed per-record cost: checksum word + header.
pub const RECORD_OVERHEAD: u64 = CRC_LEN + HEADER_LEN;

/// Decoded fixed-width portion of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Milliseconds since the Unix epoch at append time.
    pub ts: i64,
    /// Size of the UTF-8 key in bytes.
    pub key_size: u32,
    /// Size of the value in bytes; zero marks a tombstone.
    pub value_size: u64,
}

impl RecordHeader {
    /// Total on-log length of the record this header describes.
    ///
    /// Saturates instead of overflowing: a header decoded from corrupt bytes
    /// may claim an absurd value size, and the scanner's bounds check must
    /// still see a number larger than the mapping.
    pub fn record_len(&self) -> u64 {
        (RECORD_OVERHEAD + self.key_size as u64).saturating_add(self.value_size)
    }

    /// Absolute offset of the value, given the record's own offset.
    pub fn value_offset(&self, record_offset: u64) -> u64 {
        record_offset + RECORD_OVERHEAD + self.key_size as u64
    }
}

/// Serializes a full record frame into `buf`, replacing its contents.
///
/// The checksum word is reserved up front, the body is written behind it, and
/// the word is backfilled once the CRC is known — the frame then goes to the
/// log in a single positional write. The buffer is caller-owned so repeated
/// appends reuse one allocation.
pub fn encode_into(buf: &mut Vec<u8>, ts: i64, key: &[u8], value: &[u8]) {
    debug_assert!(key.len() <= u32::MAX as usize);

    buf.clear();
    buf.extend_from_slice(&[0u8; CRC_LEN as usize]);
    buf.extend_from_slice(&ts.to_ne_bytes());
    buf.extend_from_slice(&(key.len() as u32).to_ne_bytes());
    buf.extend_from_slice(&(value.len() as u64).to_ne_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);

    let crc = crc32fast::hash(&buf[CRC_LEN as usize..]) as u64;
    buf[..CRC_LEN as usize].copy_from_slice(&crc.to_ne_bytes());
}

/// Reads the fixed-width header of the record at `record_offset`.
pub fn decode_header(log: &MappedLog, record_offset: u64) -> Result<RecordHeader, MlogError> {
    let ts = log.get_i64(record_offset + CRC_LEN)?;
    let key_size = log.get_u32(record_offset + CRC_LEN + 8)?;
    let value_size = log.get_u64(record_offset + CRC_LEN + 12)?;
    Ok(RecordHeader {
        ts,
        key_size,
        value_size,
    })
}

/// Recomputes the CRC of the record at `record_offset` and compares it with
/// the stored checksum word (masked to 32 bits).
pub fn verify(
    log: &MappedLog,
    record_offset: u64,
    header: &RecordHeader,
) -> Result<bool, MlogError> {
    let stored = (log.get_u64(record_offset)? & u32::MAX as u64) as u32;
    let body_len = (HEADER_LEN + header.key_size as u64).saturating_add(header.value_size);
    let computed = log.crc32(record_offset + CRC_LEN, body_len)?;
    Ok(stored == computed)
}
