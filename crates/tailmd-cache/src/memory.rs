//! In-memory cache with least-recently-used eviction.
//!
//! [`MemoryCache`] keeps every bucket in one shared store bounded by a fixed
//! number of entries. Each `get` hit and each `set` refreshes the entry's
//! recency; inserting past capacity evicts the stalest entry across all
//! buckets.
//!
//! ```text
//! entries: (bucket, key) -> { etag, value, tick }
//! order:   tick -> (bucket, key)      # oldest tick evicted first
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Cache, CacheBucket};

type EntryKey = (String, String);

struct Entry {
    etag: String,
    value: Vec<u8>,
    tick: u64,
}

#[derive(Default)]
struct Store {
    entries: HashMap<EntryKey, Entry>,
    order: BTreeMap<u64, EntryKey>,
    tick: u64,
}

impl Store {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &EntryKey) {
        let tick = self.next_tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.order.remove(&entry.tick);
            entry.tick = tick;
            self.order.insert(tick, key.clone());
        }
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
            tracing::debug!(bucket = %key.0, key = %key.1, "evicted cache entry");
        }
    }
}

/// Bounded in-memory [`Cache`] shared by all buckets it hands out.
///
/// Cloning is cheap and clones share storage.
#[derive(Clone)]
pub struct MemoryCache {
    store: Arc<Mutex<Store>>,
    capacity: usize,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero stores nothing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            capacity,
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.store).entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            name: name.to_owned(),
            store: Arc::clone(&self.store),
            capacity: self.capacity,
        })
    }

    fn clear(&self) {
        let mut store = lock(&self.store);
        store.entries.clear();
        store.order.clear();
    }
}

/// Handle to one named partition of a [`MemoryCache`].
pub struct MemoryCacheBucket {
    name: String,
    store: Arc<Mutex<Store>>,
    capacity: usize,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let mut store = lock(&self.store);
        let entry_key = (self.name.clone(), key.to_owned());
        let entry = store.entries.get(&entry_key)?;
        if !etag.is_empty() && entry.etag != etag {
            return None;
        }
        let value = entry.value.clone();
        store.touch(&entry_key);
        Some(value)
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        if self.capacity == 0 {
            return;
        }

        let mut store = lock(&self.store);
        let entry_key = (self.name.clone(), key.to_owned());
        let tick = store.next_tick();

        if let Some(old) = store.entries.remove(&entry_key) {
            store.order.remove(&old.tick);
        }
        while store.entries.len() >= self.capacity {
            store.evict_oldest();
        }

        store.order.insert(tick, entry_key.clone());
        store.entries.insert(
            entry_key,
            Entry {
                etag: etag.to_owned(),
                value: value.to_vec(),
                tick,
            },
        );
    }
}

/// The store holds no invariants a panicking writer could break, so a
/// poisoned lock is still usable.
fn lock(store: &Mutex<Store>) -> MutexGuard<'_, Store> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_get_after_set() {
        let cache = MemoryCache::new(4);
        let bucket = cache.bucket("diagrams");
        bucket.set("a", "v1", b"one");
        assert_eq!(bucket.get("a", "v1"), Some(b"one".to_vec()));
    }

    #[test]
    fn test_etag_mismatch_misses() {
        let cache = MemoryCache::new(4);
        let bucket = cache.bucket("diagrams");
        bucket.set("a", "v1", b"one");
        assert_eq!(bucket.get("a", "v2"), None);
        assert_eq!(bucket.get("a", ""), Some(b"one".to_vec()));
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = MemoryCache::new(2);
        let bucket = cache.bucket("diagrams");
        bucket.set("a", "", b"1");
        bucket.set("b", "", b"2");

        // Touch "a" so "b" becomes the stalest entry.
        assert!(bucket.get("a", "").is_some());
        bucket.set("c", "", b"3");

        assert_eq!(cache.len(), 2);
        assert_eq!(bucket.get("b", ""), None);
        assert_eq!(bucket.get("a", ""), Some(b"1".to_vec()));
        assert_eq!(bucket.get("c", ""), Some(b"3".to_vec()));
    }

    #[test]
    fn test_overwrite_does_not_grow() {
        let cache = MemoryCache::new(2);
        let bucket = cache.bucket("diagrams");
        bucket.set("a", "", b"1");
        bucket.set("a", "", b"2");
        assert_eq!(cache.len(), 1);
        assert_eq!(bucket.get("a", ""), Some(b"2".to_vec()));
    }

    #[test]
    fn test_buckets_are_isolated_but_share_capacity() {
        let cache = MemoryCache::new(2);
        let first = cache.bucket("first");
        let second = cache.bucket("second");
        first.set("k", "", b"1");
        second.set("k", "", b"2");
        assert_eq!(first.get("k", ""), Some(b"1".to_vec()));
        assert_eq!(second.get("k", ""), Some(b"2".to_vec()));

        first.set("other", "", b"3");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_same_name_handles_share_storage() {
        let cache = MemoryCache::new(2);
        cache.bucket("diagrams").set("k", "", b"1");
        assert_eq!(cache.bucket("diagrams").get("k", ""), Some(b"1".to_vec()));
    }

    #[test]
    fn test_clear() {
        let cache = MemoryCache::new(2);
        let bucket = cache.bucket("diagrams");
        bucket.set("a", "", b"1");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(bucket.get("a", ""), None);

        bucket.set("b", "", b"2");
        assert_eq!(bucket.get("b", ""), Some(b"2".to_vec()));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = MemoryCache::new(0);
        let bucket = cache.bucket("diagrams");
        bucket.set("a", "", b"1");
        assert_eq!(bucket.get("a", ""), None);
        assert!(cache.is_empty());
    }
}
