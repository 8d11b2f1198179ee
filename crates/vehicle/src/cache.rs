//! Bounded, expiring cache of resolved vehicle image URLs.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(512).unwrap();

struct Entry {
    url: String,
    stored_at: Instant,
}

/// LRU map of `"{year}-{make}-{model}"` (lowercased) to image URL.
pub struct ImageCache {
    entries: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl ImageCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn key(year: u16, make: &str, model: &str) -> String {
        format!("{year}-{make}-{model}").to_lowercase()
    }

    /// Fresh entry for `key`; expired entries are evicted on read.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => return Some(entry.url.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub async fn insert(&self, key: String, url: String) {
        let entry = Entry {
            url,
            stored_at: Instant::now(),
        };
        self.entries.lock().await.put(key, entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
