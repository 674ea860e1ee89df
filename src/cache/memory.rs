//! # In-Memory Cache Store
//!
//! A process-local cache backed by `DashMap` with per-entry TTL. Expired
//! entries are removed lazily on `get` and eagerly by a background sweep
//! task running on a configurable interval.

use super::{CacheResult, CacheStore, CacheStoreStats, CachedResponse};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::debug;

/// In-memory cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryCacheConfig {
    /// Sweep interval for expired entries
    pub cleanup_interval: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

/// A stored value with its absolute expiry time
#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedResponse,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: CachedResponse, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory cache implementation
pub struct InMemoryCache {
    /// Cache entries storage
    entries: Arc<DashMap<String, CacheEntry>>,

    /// Atomic counters for statistics
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    expired_cleanups: Arc<AtomicU64>,

    /// Background sweep task handle; aborted when the cache is dropped
    _cleanup_task: tokio::task::JoinHandle<()>,
}

impl InMemoryCache {
    /// Create a new in-memory cache and start its sweep task
    pub fn new(config: InMemoryCacheConfig) -> Self {
        let entries: Arc<DashMap<String, CacheEntry>> = Arc::new(DashMap::new());
        let expired_cleanups = Arc::new(AtomicU64::new(0));

        let cleanup_task = {
            let entries = entries.clone();
            let expired_cleanups = expired_cleanups.clone();
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = interval(cleanup_interval);
                loop {
                    interval.tick().await;
                    Self::sweep_expired(&entries, &expired_cleanups);
                }
            })
        };

        Self {
            entries,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            expired_cleanups,
            _cleanup_task: cleanup_task,
        }
    }

    /// Remove all expired entries in one pass
    fn sweep_expired(entries: &DashMap<String, CacheEntry>, expired_cleanups: &AtomicU64) {
        let expired_keys: Vec<String> = entries
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        let mut cleaned = 0u64;
        for key in expired_keys {
            if entries.remove(&key).is_some() {
                cleaned += 1;
            }
        }

        if cleaned > 0 {
            expired_cleanups.fetch_add(cleaned, Ordering::Relaxed);
            debug!("Swept {} expired cache entries", cleaned);
        }
    }
}

impl Drop for InMemoryCache {
    fn drop(&mut self) {
        self._cleanup_task.abort();
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                if self.entries.remove(key).is_some() {
                    self.expired_cleanups.fetch_add(1, Ordering::Relaxed);
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }

            let value = entry.value.clone();
            self.hits.fetch_add(1, Ordering::Relaxed);
            Ok(Some(value))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration) -> CacheResult<()> {
        // Last-write-wins on key collision
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn stats(&self) -> CacheResult<CacheStoreStats> {
        Ok(CacheStoreStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_cleanups: self.expired_cleanups.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::sleep;

    fn response(body: serde_json::Value) -> CachedResponse {
        CachedResponse::new(200, body)
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());

        let key = "GET:/players/%232PP00";
        let value = response(json!({"tag": "#2PP00"}));
        let ttl = Duration::from_secs(60);

        cache.set(key, value.clone(), ttl).await.unwrap();
        let result = cache.get(key).await.unwrap();
        assert_eq!(result, Some(value));

        assert!(cache.delete(key).await.unwrap());
        assert_eq!(cache.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());

        let key = "expire_test";
        cache
            .set(key, response(json!({"n": 1})), Duration::from_millis(100))
            .await
            .unwrap();

        // Retrievable before the TTL elapses
        assert!(cache.get(key).await.unwrap().is_some());

        sleep(Duration::from_millis(150)).await;

        // Absent after the TTL, identical to a never-written key
        assert_eq!(cache.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_overwrite_is_last_write_wins() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());
        let ttl = Duration::from_secs(60);

        cache
            .set("key", response(json!({"v": 1})), ttl)
            .await
            .unwrap();
        cache
            .set("key", response(json!({"v": 2})), ttl)
            .await
            .unwrap();

        let result = cache.get("key").await.unwrap().unwrap();
        assert_eq!(result.body["v"], 2);
    }

    #[tokio::test]
    async fn test_background_sweep() {
        let cache = InMemoryCache::new(InMemoryCacheConfig {
            cleanup_interval: Duration::from_millis(50),
        });

        cache
            .set("sweep_me", response(json!({})), Duration::from_millis(20))
            .await
            .unwrap();

        sleep(Duration::from_millis(150)).await;

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
        assert!(stats.expired_cleanups >= 1);
    }

    #[tokio::test]
    async fn test_stats_counters() {
        let cache = InMemoryCache::new(InMemoryCacheConfig::default());

        cache
            .set("key1", response(json!({})), Duration::from_secs(60))
            .await
            .unwrap();
        cache.get("key1").await.unwrap(); // hit
        cache.get("key2").await.unwrap(); // miss

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let ttl = Duration::from_secs(60);

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("key_{}", i % 4);
                cache
                    .set(&key, CachedResponse::new(200, json!({"i": i})), ttl)
                    .await
                    .unwrap();
                cache.get(&key).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Colliding writers resolve to some writer's value, never corruption
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 4);
    }
}
