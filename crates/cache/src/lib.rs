//! Hot-value cache with least-recently-accessed eviction.
//!
//! The cache sits between the store and the mapped log, holding the value
//! bytes of recently read or written keys. Both `get` and `put` count as an
//! access and promote the key to most-recently-used; when an insertion pushes
//! the cache past its capacity, the least-recently-accessed entry is dropped.
//!
//! # Design
//!
//! A `HashMap` gives O(1) lookups; each map node carries `prev`/`next` links
//! forming a doubly-linked recency list (head = most recent, tail = eviction
//! victim), so promotion and eviction are O(1) as well. The cache is purely
//! read-through: the log is the source of truth, so eviction never writes
//! anything back.

use std::collections::HashMap;

struct Node {
    value: Vec<u8>,
    /// Neighbour toward the MRU end, `None` for the head.
    prev: Option<String>,
    /// Neighbour toward the LRU end, `None` for the tail.
    next: Option<String>,
}

/// Bounded `key → value bytes` map with exact LRU eviction.
///
/// A capacity of zero disables caching entirely: every `put` is a no-op and
/// every `get` misses.
pub struct LruCache {
    map: HashMap<String, Node>,
    head: Option<String>,
    tail: Option<String>,
    capacity: usize,
}

impl LruCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the cached value and promotes the key to most-recently-used.
    pub fn get(&mut self, key: &str) -> Option<&Vec<u8>> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.map.get(key).map(|node| &node.value)
    }

    /// Inserts or replaces the value for `key` as the most-recently-used
    /// entry, evicting the least-recently-accessed entry if the cache would
    /// exceed its capacity.
    pub fn put(&mut self, key: &str, value: Vec<u8>) {
        if self.capacity == 0 {
            return;
        }

        if let Some(node) = self.map.get_mut(key) {
            node.value = value;
            self.touch(key);
            return;
        }

        if self.map.len() >= self.capacity {
            self.evict_lru();
        }

        self.map.insert(
            key.to_string(),
            Node {
                value,
                prev: None,
                next: None,
            },
        );
        self.push_front(key);
    }

    /// Drops `key` from the cache, returning its value if present.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.detach(key);
        self.map.remove(key).map(|node| node.value)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.head = None;
        self.tail = None;
    }

    /// Moves an existing key to the front of the recency list.
    fn touch(&mut self, key: &str) {
        if self.head.as_deref() == Some(key) {
            return;
        }
        self.detach(key);
        self.push_front(key);
    }

    /// Unlinks `key` from the recency list, leaving its map node in place
    /// with cleared links.
    fn detach(&mut self, key: &str) {
        let (prev, next) = match self.map.get_mut(key) {
            Some(node) => (node.prev.take(), node.next.take()),
            None => return,
        };

        match &prev {
            Some(p) => {
                if let Some(node) = self.map.get_mut(p) {
                    node.next = next.clone();
                }
            }
            None => self.head = next.clone(),
        }
        match &next {
            Some(n) => {
                if let Some(node) = self.map.get_mut(n) {
                    node.prev = prev.clone();
                }
            }
            None => self.tail = prev,
        }
    }

    /// Links an unlinked key in as the new head.
    fn push_front(&mut self, key: &str) {
        let old_head = self.head.replace(key.to_string());

        if let Some(h) = &old_head {
            if let Some(node) = self.map.get_mut(h) {
                node.prev = Some(key.to_string());
            }
        }
        if let Some(node) = self.map.get_mut(key) {
            node.next = old_head;
        }
        if self.tail.is_none() {
            self.tail = Some(key.to_string());
        }
    }

    fn evict_lru(&mut self) {
        if let Some(victim) = self.tail.clone() {
            self.detach(&victim);
            self.map.remove(&victim);
        }
    }
}

impl std::fmt::Debug for LruCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.map.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
