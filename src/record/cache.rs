//! The record store's hot-record cache, keyed by `record.key`.
//!
//! An `lru::LruCache` behind a `parking_lot::RwLock` so lookups from
//! synchronous call sites don't need to hop onto the async runtime.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::RwLock;
use uuid::Uuid;

/// LRU cache mapping a record's `key` to its id, used to enforce
/// `maxCacheSize` independently of the backing vector's length.
pub struct RecordCache {
    inner: RwLock<LruCache<String, Uuid>>,
}

impl RecordCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { inner: RwLock::new(LruCache::new(capacity)) }
    }

    /// Insert or refresh `key -> id`. Returns the id evicted to make room,
    /// if any.
    pub fn put(&self, key: String, id: Uuid) -> Option<Uuid> {
        self.inner.write().push(key, id).map(|(_, evicted_id)| evicted_id)
    }

    /// Touch `key`, marking it most-recently-used, and return its id.
    pub fn get(&self, key: &str) -> Option<Uuid> {
        self.inner.write().get(key).copied()
    }

    pub fn remove(&self, key: &str) {
        self.inner.write().pop(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Ids evicted by shrinking the cache down to `capacity`, oldest first.
    /// Used by `consolidate()`'s "LRU-evict cache down to capacity" step.
    pub fn evict_to_capacity(&self, capacity: usize) -> Vec<Uuid> {
        let mut inner = self.inner.write();
        let mut evicted = Vec::new();
        while inner.len() > capacity {
            if let Some((_, id)) = inner.pop_lru() {
                evicted.push(id);
            } else {
                break;
            }
        }
        evicted
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}
