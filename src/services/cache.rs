use crate::services::clock::{Clock, SystemClock};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A thread-safe cache with TTL support.
pub struct Cache<V> {
    data: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// A memoized payload and its validity window (unix millis).
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub payload: V,
    pub created_at: i64,
    pub expires_at: i64,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Entries currently stored (including expired, not yet purged).
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl<V: Clone> Cache<V> {
    /// Create a new cache with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Create a cache that reads time from `clock`.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            data: DashMap::new(),
            default_ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a value from the cache. Expired entries are purged and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_entry(key).map(|entry| entry.payload)
    }

    /// Get the full entry for a valid key.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now_millis();
        let Some(entry) = self.data.get(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        if now <= entry.expires_at {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(entry.clone())
        } else {
            drop(entry);
            self.remove_expired(key, now);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!("Cache entry {} expired", key);
            None
        }
    }

    /// Set a value in the cache with the default TTL.
    pub fn set(&self, key: String, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Set a value in the cache with a custom TTL. Overwrites unconditionally.
    pub fn set_with_ttl(&self, key: String, value: V, ttl: Duration) {
        let now = self.clock.now_millis();
        self.data.insert(
            key,
            CacheEntry {
                payload: value,
                created_at: now,
                expires_at: now + ttl.as_millis() as i64,
            },
        );
    }

    /// Check if a key exists and is not expired.
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now_millis();
        let valid = match self.data.get(key) {
            Some(entry) => now <= entry.expires_at,
            None => return false,
        };
        if !valid {
            self.remove_expired(key, now);
        }
        valid
    }

    /// Remove `key` only if it is still expired. A concurrent `set` between
    /// the expiry check and the removal keeps its fresh entry.
    fn remove_expired(&self, key: &str, now: i64) {
        self.data.remove_if(key, |_, entry| now > entry.expires_at);
    }

    /// Remove a value from the cache.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.data.remove(key).map(|(_, entry)| entry.payload)
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        self.data.clear();
    }

    /// Remove all expired entries from the cache, returning how many were purged.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.data.len();
        self.data.retain(|_, entry| now <= entry.expires_at);
        before.saturating_sub(self.data.len())
    }

    /// Get the number of entries in the cache (including expired).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.data.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Build a cache key that does not depend on parameter order.
///
/// Parameters are sorted by name and joined as `name:value` pairs, so
/// identical logical requests always map to the same key.
pub fn generate_key<K, V, I>(base: &str, params: I) -> String
where
    K: AsRef<str>,
    V: Display,
    I: IntoIterator<Item = (K, V)>,
{
    let mut pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.to_string()))
        .collect();
    pairs.sort();

    let mut key = base.to_string();
    for (name, value) in pairs {
        key.push('|');
        key.push_str(&name);
        key.push(':');
        key.push_str(&value);
    }
    key
}

/// Something the background sweeper can purge.
pub trait Sweepable: Send + Sync {
    /// Purge expired entries, returning how many were removed.
    fn sweep(&self) -> usize;
}

impl<V: Clone + Send + Sync> Sweepable for Cache<V> {
    fn sweep(&self) -> usize {
        self.cleanup()
    }
}

/// Background task that periodically purges expired entries.
///
/// Must be started inside a tokio runtime. The task stops on
/// [`CacheSweeper::shutdown`] or when the sweeper is dropped.
pub struct CacheSweeper {
    handle: Option<JoinHandle<()>>,
}

impl CacheSweeper {
    /// Spawn the sweep loop over `caches`.
    pub fn start(caches: Vec<Arc<dyn Sweepable>>, interval: Duration) -> Self {
        info!(
            "Starting cache sweeper ({} caches, every {:?})",
            caches.len(),
            interval
        );

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let purged: usize = caches.iter().map(|cache| cache.sweep()).sum();
                if purged > 0 {
                    debug!("Cache sweep purged {} expired entries", purged);
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the sweep loop.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Cache sweeper stopped");
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.stop();
    }
}
