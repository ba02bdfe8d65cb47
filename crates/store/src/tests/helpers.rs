use std::path::Path;

use crate::{Options, Store};

/// Opens a store with default options, panicking on failure.
pub fn open_store(path: &Path) -> Store {
    Store::open(path, Options::default()).unwrap()
}

/// Options with a specific initial mapping size and cache capacity.
pub fn opts(initial_len: u64, cache_size: usize) -> Options {
    Options {
        initial_len,
        cache_size,
        ..Options::default()
    }
}
