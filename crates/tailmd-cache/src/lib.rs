//! Bounded caching for rendered collaborator output.
//!
//! Rendering is a pure function of its input, so a collaborator with an
//! expensive backend (the Kroki diagram renderer) can memoize results without
//! affecting what a streaming session emits. Entries live in named buckets and
//! carry an etag; a renderer upgrade changes the etag and old entries stop
//! matching instead of being migrated.
//!
//! [`MemoryCache`] is the only storing implementation. It is process-local,
//! holds at most `capacity` entries across all buckets and evicts the least
//! recently used one first. Clones share the store, so one cache can be handed
//! to several renderers and cleared from anywhere. [`NullCache`] disables
//! caching.
//!
//! # Example
//!
//! ```
//! use tailmd_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new(2);
//! let svgs = cache.bucket("diagrams");
//! svgs.set("sha256-of-source", "0.1.0", b"<svg></svg>");
//! assert_eq!(svgs.get("sha256-of-source", "0.1.0"), Some(b"<svg></svg>".to_vec()));
//! assert_eq!(svgs.get("sha256-of-source", "0.2.0"), None);
//!
//! cache.clear();
//! assert!(cache.is_empty());
//! ```

mod memory;
pub use memory::{MemoryCache, MemoryCacheBucket};

/// Handle to one bucket of a [`Cache`].
///
/// Keys are caller-chosen (a content hash for diagrams). An empty `etag` on
/// `get` accepts whatever etag the entry was stored with.
pub trait CacheBucket: Send + Sync {
    /// Stored bytes for `key`, if present and stored under `etag`.
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Store `value`, replacing any entry for `key` whatever its etag.
    fn set(&self, key: &str, etag: &str, value: &[u8]);
}

/// Source of [`CacheBucket`] handles.
///
/// Buckets with different names never see each other's keys; handles to the
/// same name share entries.
pub trait Cache: Send + Sync {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;

    /// Drop every entry in every bucket. A no-op for caches that store nothing.
    fn clear(&self) {}
}

/// Bucket of [`NullCache`]: `set` is discarded and `get` always misses.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) {}
}

/// Cache that stores nothing; used when diagram caching is off.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(NullCache: Send, Sync);
    static_assertions::assert_impl_all!(MemoryCache: Send, Sync);

    #[test]
    fn test_null_cache_always_misses() {
        let cache = NullCache;
        let bucket = cache.bucket("diagrams");

        assert_eq!(bucket.get("key", "etag1"), None);

        bucket.set("key", "etag1", b"hello");
        assert_eq!(bucket.get("key", "etag1"), None);
    }

    #[test]
    fn test_null_cache_clear_is_noop() {
        let cache = NullCache;
        cache.clear();
        assert_eq!(cache.bucket("diagrams").get("k", ""), None);
    }

    #[test]
    fn test_backends_swap_behind_trait_object() {
        let backends: Vec<Box<dyn Cache>> =
            vec![Box::new(NullCache), Box::new(MemoryCache::new(1))];
        let hits: Vec<bool> = backends
            .iter()
            .map(|cache| {
                let bucket = cache.bucket("diagrams");
                bucket.set("svg", "1.0.0", b"<svg/>");
                let hit = bucket.get("svg", "1.0.0").is_some();
                assert_eq!(bucket.get("svg", "2.0.0"), None);
                cache.clear();
                assert_eq!(bucket.get("svg", ""), None);
                hit
            })
            .collect();
        assert_eq!(hits, vec![false, true]);
    }
}
