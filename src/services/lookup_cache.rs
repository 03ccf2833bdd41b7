use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Clone)]
struct CachedEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Memoizes by-id lookups for `ttl`.
///
/// Concurrent misses for the same key are serialized behind a per-key lock
/// and re-check the cache once the lock is held, so only the first caller
/// runs `fetch`. Errors and `None` results are never cached.
pub struct LookupCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, CachedEntry<V>>,
    in_flight: DashMap<K, Arc<Mutex<()>>>,
}

impl<K, V> LookupCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Returns the cached value if it is younger than the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).and_then(|entry| {
            if entry.fetched_at.elapsed() < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(Some(value));
        }

        let lock = self
            .in_flight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;

            // Another task may have filled the entry while we waited.
            if let Some(value) = self.get(&key) {
                Ok(Some(value))
            } else {
                let fetched = fetch().await;
                if let Ok(Some(value)) = &fetched {
                    self.entries.insert(
                        key.clone(),
                        CachedEntry {
                            value: value.clone(),
                            fetched_at: Instant::now(),
                        },
                    );
                }
                fetched
            }
        };

        // Once only the map holds the lock, nobody is waiting on this key.
        drop(lock);
        self.in_flight
            .remove_if(&key, |_, held| Arc::strong_count(held) == 1);

        result
    }

    /// Seeds or replaces an entry.
    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            CachedEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drops entries older than the TTL and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
