//! In-memory Cache Store
//!
//! Bounded LRU map with per-entry expiry. Entries are evicted lazily on read
//! once their age exceeds the `max_age_days` they were stored with.

use async_trait::async_trait;
use bridge_traits::{cache::CacheStore, error::Result, time::Clock, SystemClock};
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 1024;

struct Entry {
    value: Bytes,
    expires_at: DateTime<Utc>,
}

/// LRU-backed [`CacheStore`]
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    /// Create a store holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self::with_clock(capacity, Arc::new(SystemClock))
    }

    /// Create a store whose expiry is evaluated against `clock`
    pub fn with_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    /// Number of entries currently held, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            trace!(key, "Cache entry expired");
            entries.pop(key);
        }

        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, max_age_days: u32) -> Result<()> {
        let expires_at = self.clock.now() + Duration::days(i64::from(max_age_days));
        self.entries
            .lock()
            .await
            .put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.pop(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    struct SteppingClock(StdMutex<DateTime<Utc>>);

    impl SteppingClock {
        fn advance(&self, by: Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryCacheStore::new(8);
        store.set("album/get", Bytes::from("{}"), 7).await.unwrap();

        assert_eq!(
            store.get("album/get").await.unwrap(),
            Some(Bytes::from("{}"))
        );
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_entries_expire_after_max_age() {
        let clock = Arc::new(SteppingClock(StdMutex::new(Utc::now())));
        let store = MemoryCacheStore::with_clock(8, clock.clone());
        store.set("k", Bytes::from("v"), 7).await.unwrap();

        clock.advance(Duration::days(6));
        assert!(store.get("k").await.unwrap().is_some());

        clock.advance(Duration::days(2));
        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let store = MemoryCacheStore::new(2);
        store.set("a", Bytes::from("1"), 1).await.unwrap();
        store.set("b", Bytes::from("2"), 1).await.unwrap();
        store.set("c", Bytes::from("3"), 1).await.unwrap();

        assert_eq!(store.len().await, 2);
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryCacheStore::default();
        store.set("k", Bytes::from("v"), 1).await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }
}
