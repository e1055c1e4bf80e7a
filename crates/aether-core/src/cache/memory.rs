//! Bounded in-memory LRU tier.
//!
//! Entries carry their own deadline and are expired lazily on read. All
//! accessors go through a single mutex; operations are O(1).

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct MemoryEntry {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// Mutex-guarded LRU byte cache.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, MemoryEntry>>,
}

impl MemoryCache {
    /// Creates a cache bounded to `capacity` entries. A zero capacity is
    /// bumped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns a copy of the stored bytes, promoting the entry to
    /// most-recently-used. Expired entries are evicted on the spot.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let Ok(mut entries) = self.entries.lock() else {
            return None;
        };
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at <= Instant::now() => true,
            Some(entry) => return Some(entry.bytes.clone()),
            None => return None,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    /// Stores a copy of `bytes` under `key`, evicting the LRU entry on
    /// capacity overflow.
    pub fn set(&self, key: &str, bytes: &[u8], ttl: Duration) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.put(
            key.to_string(),
            MemoryEntry {
                bytes: bytes.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Removes an entry if present.
    pub fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.pop(key);
        }
    }

    /// Number of live entries (expired-but-unread entries included).
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// True when the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
