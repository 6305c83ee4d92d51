//! Bounded LRU cache of resolutions.
//!
//! # Design Decisions
//! - One `parking_lot::Mutex` guards both the entries and the recency index,
//!   so every get/insert is a single serialized update
//! - Recency is a monotonically increasing stamp; the oldest stamp is the
//!   eviction victim
//! - Capacity zero disables caching

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

/// Cache key: requested path and optional method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: String,
    pub method: Option<String>,
}

impl CacheKey {
    pub fn new(path: &str, method: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            method: method.map(str::to_string),
        }
    }
}

struct Entry<V> {
    value: V,
    stamp: u64,
}

struct LruState<V> {
    entries: HashMap<CacheKey, Entry<V>>,
    recency: BTreeMap<u64, CacheKey>,
    clock: u64,
}

impl<V> LruState<V> {
    fn touch(&mut self, key: &CacheKey) -> Option<&mut Entry<V>> {
        self.clock += 1;
        let stamp = self.clock;
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.stamp);
        self.recency.insert(stamp, key.clone());
        entry.stamp = stamp;
        Some(entry)
    }
}

/// Thread-safe LRU cache.
pub struct ResolutionCache<V> {
    capacity: usize,
    state: Mutex<LruState<V>>,
}

impl<V> ResolutionCache<V> {
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V: Clone> ResolutionCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LruState {
                entries: HashMap::with_capacity(capacity),
                recency: BTreeMap::new(),
                clock: 0,
            }),
        }
    }

    /// Look up and mark as most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if self.capacity == 0 {
            return None;
        }
        let mut state = self.state.lock();
        state.touch(key).map(|entry| entry.value.clone())
    }

    /// Store a value, returning the key evicted to make room, if any.
    pub fn insert(&self, key: CacheKey, value: V) -> Option<CacheKey> {
        if self.capacity == 0 {
            return None;
        }
        let mut state = self.state.lock();
        if let Some(entry) = state.touch(&key) {
            entry.value = value;
            return None;
        }

        let mut evicted = None;
        if state.entries.len() >= self.capacity {
            if let Some((_, oldest)) = state.recency.pop_first() {
                state.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        state.clock += 1;
        let stamp = state.clock;
        state.recency.insert(stamp, key.clone());
        state.entries.insert(key, Entry { value, stamp });
        evicted
    }

    /// Presence check that does not affect recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.recency.clear();
    }
}
