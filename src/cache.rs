//! In-memory LRU cache with a time-to-live, used for catalog lookups.
//!
//! Concurrent misses for the same key share one in-flight fetch, so a burst
//! of identical lookups only reaches the upstream API once.

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

type InFlight<V> = Shared<BoxFuture<'static, Result<V, String>>>;

struct Inner<V> {
    // Least recently used first
    entries: IndexMap<String, (Instant, V)>,
    in_flight: HashMap<String, InFlight<V>>,
}

#[derive(Clone)]
pub struct TtlCache<V> {
    inner: Arc<Mutex<Inner<V>>>,
    capacity: usize,
    ttl: Duration,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: IndexMap::new(),
                in_flight: HashMap::new(),
            })),
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        lock_inner(&self.inner)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        fresh_entry(&mut self.lock(), key, self.ttl)
    }

    pub fn set(&self, key: &str, value: V) {
        insert_entry(&mut self.lock(), key, value, self.capacity);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Return the cached value for `key` or run `fetch` to produce it.
    ///
    /// Failed fetches are not cached. Callers waiting on a shared fetch
    /// receive the same error message.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        // Entry and in-flight lookups share one lock
        let shared = {
            let mut inner = self.lock();
            if let Some(value) = fresh_entry(&mut inner, key, self.ttl) {
                log::debug!("Cache hit: {}", key);
                return Ok(value);
            }
            match inner.in_flight.get(key).cloned() {
                Some(existing) => {
                    log::debug!("Joining in-flight fetch: {}", key);
                    existing
                }
                None => {
                    let state = Arc::clone(&self.inner);
                    let owned_key = key.to_string();
                    let capacity = self.capacity;
                    let request = fetch();

                    let future = async move {
                        let result = request.await.map_err(|e| format!("{:#}", e));
                        let mut inner = lock_inner(&state);
                        inner.in_flight.remove(&owned_key);
                        if let Ok(value) = &result {
                            insert_entry(&mut inner, &owned_key, value.clone(), capacity);
                        }
                        result
                    }
                    .boxed()
                    .shared();

                    inner.in_flight.insert(key.to_string(), future.clone());
                    future
                }
            }
        };

        shared.await.map_err(anyhow::Error::msg)
    }
}

fn lock_inner<V>(inner: &Mutex<Inner<V>>) -> MutexGuard<'_, Inner<V>> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Look up `key`, dropping it when expired and marking it most recently used otherwise
fn fresh_entry<V: Clone>(inner: &mut Inner<V>, key: &str, ttl: Duration) -> Option<V> {
    let (stored_at, value) = inner.entries.shift_remove(key)?;
    if stored_at.elapsed() > ttl {
        return None;
    }
    inner.entries.insert(key.to_string(), (stored_at, value.clone()));
    Some(value)
}

fn insert_entry<V>(inner: &mut Inner<V>, key: &str, value: V, capacity: usize) {
    inner.entries.shift_remove(key);
    inner.entries.insert(key.to_string(), (Instant::now(), value));
    while inner.entries.len() > capacity {
        inner.entries.shift_remove_index(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_set() {
        let cache = TtlCache::new(10, DEFAULT_TTL);
        assert_eq!(cache.get("a"), None);
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = TtlCache::new(2, DEFAULT_TTL);
        cache.set("a", 1);
        cache.set("b", 2);
        // Touch "a" so "b" becomes the eviction candidate
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_entries_expire() {
        let cache = TtlCache::new(10, Duration::from_millis(20));
        cache.set("a", 1);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache: TtlCache<String> = TtlCache::new(10, DEFAULT_TTL);
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok("album".to_string())
            }
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch("album/1", fetch),
            cache.get_or_fetch("album/1", fetch),
            cache.get_or_fetch("album/1", fetch),
        );
        assert_eq!(a.unwrap(), "album");
        assert_eq!(b.unwrap(), "album");
        assert_eq!(c.unwrap(), "album");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Served from the cache afterwards
        let d = cache.get_or_fetch("album/1", fetch).await.unwrap();
        assert_eq!(d, "album");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_uses_fresh_entry_and_refetches_expired() {
        let cache: TtlCache<u32> = TtlCache::new(10, Duration::from_millis(20));
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = || {
            let calls = Arc::clone(&calls);
            async move { Ok(calls.fetch_add(1, Ordering::SeqCst) as u32 + 10) }
        };

        cache.set("k", 1);
        assert_eq!(cache.get_or_fetch("k", fetch).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get_or_fetch("k", fetch).await.unwrap(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("k"), Some(10));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new(10, DEFAULT_TTL);
        let err = cache
            .get_or_fetch("x", || async { Err(anyhow::anyhow!("upstream down")) })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upstream down"));

        let value = cache.get_or_fetch("x", || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
