//! Capacity-bounded hot cache keyed by chunk (spec §4.E).
//!
//! Backed by an `IndexMap` so recency order and lookup share one structure:
//! the map's iteration order doubles as least-recently-used to
//! most-recently-used, and a touch is just a `move_index` to the back.

use indexmap::IndexMap;
use std::hash::Hash;

pub struct LruCache<K, V> {
    capacity: usize,
    entries: IndexMap<K, V>,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(idx, last);
        self.entries.get_mut(key)
    }

    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    /// Inserts or updates `key`, touching it to most-recently-used. Returns
    /// the evicted entry, if any: either the entry bumped out by capacity,
    /// or `(key, value)` itself when `capacity` is zero.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.capacity == 0 {
            return Some((key, value));
        }
        if let Some(idx) = self.entries.get_index_of(&key) {
            self.entries.insert(key.clone(), value);
            let last = self.entries.len() - 1;
            self.entries.move_index(idx, last);
            return None;
        }
        self.entries.insert(key, value);
        if self.entries.len() > self.capacity {
            return self.entries.shift_remove_index(0);
        }
        None
    }

    pub fn delete(&mut self, key: &K) -> Option<V> {
        self.entries.shift_remove(key)
    }

    /// Iterates from least- to most-recently-used.
    pub fn iter_by_recency(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}
