//! Resolved document caching layer

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

struct CacheInner {
    lru: LruCache<String, Arc<Vec<u8>>>,
    total_bytes: usize,
}

/// Cache of resolved document bytes keyed by locator, with entry count and byte budget limits
pub struct DocumentCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
}

impl DocumentCache {
    /// Create a new cache with the specified entry capacity and byte budget
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Store document bytes under a locator.
    /// Entries larger than the whole budget are not stored.
    /// Evicts LRU entries until the byte budget is satisfied.
    pub fn put(&self, locator: &str, data: Arc<Vec<u8>>) {
        let new_size = data.len();
        if new_size > self.max_bytes {
            return;
        }

        let mut inner = self.inner.lock();

        if let Some(old) = inner.lru.pop(locator) {
            inner.total_bytes = inner.total_bytes.saturating_sub(old.len());
        }

        while inner.total_bytes + new_size > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((_, evicted)) => {
                    inner.total_bytes = inner.total_bytes.saturating_sub(evicted.len());
                }
                None => break,
            }
        }

        // Count-based eviction from `push` must also release its bytes
        inner.total_bytes += new_size;
        if let Some((key, evicted)) = inner.lru.push(locator.to_string(), data) {
            if key != locator {
                inner.total_bytes = inner.total_bytes.saturating_sub(evicted.len());
            }
        }
    }

    /// Get document bytes for a locator, marking it most recently used
    pub fn get(&self, locator: &str) -> Option<Arc<Vec<u8>>> {
        self.inner.lock().lru.get(locator).cloned()
    }

    /// Check if a locator is cached
    pub fn contains(&self, locator: &str) -> bool {
        self.inner.lock().lru.contains(locator)
    }

    /// Remove an entry
    pub fn remove(&self, locator: &str) -> Option<Arc<Vec<u8>>> {
        let mut inner = self.inner.lock();
        let removed = inner.lru.pop(locator)?;
        inner.total_bytes = inner.total_bytes.saturating_sub(removed.len());
        Some(removed)
    }

    /// Clear all entries
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.total_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    /// Total bytes currently stored
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(len: usize) -> Arc<Vec<u8>> {
        Arc::new(vec![0u8; len])
    }

    #[test]
    fn test_cache_basic_operations() {
        let cache = DocumentCache::new(10, 1024 * 1024);
        assert!(cache.is_empty());

        cache.put("a.pdf", Arc::new(vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_bytes(), 3);
        assert_eq!(cache.get("a.pdf").unwrap().as_slice(), &[1, 2, 3]);
        assert!(cache.contains("a.pdf"));
        assert!(!cache.contains("b.pdf"));
    }

    #[test]
    fn test_cache_count_eviction_releases_bytes() {
        let cache = DocumentCache::new(2, 1024);

        cache.put("a.pdf", bytes(10));
        cache.put("b.pdf", bytes(10));
        cache.put("c.pdf", bytes(10));

        assert!(!cache.contains("a.pdf"));
        assert!(cache.contains("b.pdf"));
        assert!(cache.contains("c.pdf"));
        assert_eq!(cache.total_bytes(), 20);
    }

    #[test]
    fn test_cache_byte_budget_eviction() {
        let cache = DocumentCache::new(10, 100);

        cache.put("a.pdf", bytes(30));
        cache.put("b.pdf", bytes(30));
        cache.put("c.pdf", bytes(30));
        cache.put("d.pdf", bytes(30));

        assert!(!cache.contains("a.pdf"));
        assert!(cache.contains("d.pdf"));
        assert_eq!(cache.total_bytes(), 90);
    }

    #[test]
    fn test_cache_oversized_entry_rejected() {
        let cache = DocumentCache::new(10, 50);
        cache.put("huge.pdf", bytes(100));
        assert!(cache.is_empty());
        assert_eq!(cache.total_bytes(), 0);
    }

    #[test]
    fn test_cache_update_and_remove() {
        let cache = DocumentCache::new(10, 1024);

        cache.put("a.pdf", bytes(50));
        cache.put("a.pdf", bytes(30));
        assert_eq!(cache.total_bytes(), 30);
        assert_eq!(cache.len(), 1);

        assert!(cache.remove("a.pdf").is_some());
        assert_eq!(cache.total_bytes(), 0);

        cache.put("b.pdf", bytes(5));
        cache.clear();
        assert!(cache.is_empty());
    }
}
