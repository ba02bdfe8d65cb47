//! Read path: `get()` through cache → keydir → mapped log.

use crate::{Result, Store};

impl Store {
    /// Looks up a key, returning its value bytes if it is live.
    ///
    /// A cache hit returns immediately and promotes the entry to
    /// most-recently-used. On a miss the keydir gives the value's location,
    /// the bytes are copied out of the mapping, and the value is installed
    /// in the cache before returning.
    ///
    /// Absent and deleted keys are `Ok(None)`, not errors.
    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value.clone()));
        }

        let entry = match self.keydir.get(key) {
            Some(entry) => *entry,
            None => return Ok(None),
        };
        if entry.value_size == 0 {
            // tombstone entry; never inserted by this store's write path
            return Ok(None);
        }

        let value = self
            .log
            .get_bytes(entry.value_offset, entry.value_size)?
            .to_vec();
        self.cache.put(key, value.clone());
        Ok(Some(value))
    }
}
