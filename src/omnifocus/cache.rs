//! In-memory response cache with per-entry TTL and prefix invalidation.
//!
//! Expired entries are dropped lazily on read. The clock is
//! `tokio::time::Instant`, so paused-time tests can move it forward.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for ResponseCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> ResponseCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key` if present and still fresh. A stale entry is removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `value`, replacing any previous entry and its expiry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .lock()
            .insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Remove every entry whose key starts with `prefix`; returns how many.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }

    /// Number of stored entries, including ones that expired but were not read since.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entry_expires_after_ttl() {
        let cache = ResponseCache::new();
        cache.set("tasks:list:{}", 1u32, Duration::from_millis(100));

        tokio::time::advance(Duration::from_millis(99)).await;
        assert_eq!(cache.get("tasks:list:{}"), Some(1));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("tasks:list:{}"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn set_replaces_value_and_expiry() {
        let cache = ResponseCache::new();
        cache.set("k", 1u32, Duration::from_millis(10));
        tokio::time::advance(Duration::from_millis(5)).await;
        cache.set("k", 2u32, Duration::from_millis(10));

        tokio::time::advance(Duration::from_millis(8)).await;
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_is_never_served() {
        let cache = ResponseCache::new();
        cache.set("k", 1u32, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn prefix_invalidation_is_scoped() {
        let cache = ResponseCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("tasks:list:{}", 1u32, ttl);
        cache.set("tasks:get:{\"id\":\"a\"}", 2, ttl);
        cache.set("tags:list", 3, ttl);

        assert_eq!(cache.invalidate_prefix("tasks:"), 2);
        assert_eq!(cache.get("tags:list"), Some(3));
        assert_eq!(cache.invalidate_prefix("tasks:"), 0);
    }

    #[test]
    fn invalidate_all_clears() {
        let cache = ResponseCache::new();
        cache.set("a", 1u32, Duration::from_secs(1));
        cache.set("b", 2u32, Duration::from_secs(1));
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
