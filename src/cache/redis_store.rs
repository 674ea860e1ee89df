//! # Redis Cache Store
//!
//! A shared cache backed by Redis, for deployments running more than one
//! proxy instance against the same upstream quota. Entries are stored as
//! JSON strings under a configurable key prefix with `SET ... EX` so Redis
//! owns the TTL cleanup.
//!
//! A Redis failure surfaces as a `CacheError`; the resolver treats it as a
//! cache miss rather than failing the request.

use super::{CacheError, CacheResult, CacheStore, CacheStoreStats, CachedResponse};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Key prefix for all cache entries
    pub key_prefix: String,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "statsproxy:cache:".to_string(),
        }
    }
}

/// Redis cache implementation
pub struct RedisCache {
    config: RedisCacheConfig,

    /// Connection manager; handles reconnects internally and is cheap to
    /// clone per operation
    connection: ConnectionManager,

    /// Statistics counters
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl RedisCache {
    /// Create a new Redis cache, connecting eagerly so a bad URL fails at
    /// startup instead of on the first request
    pub async fn new(config: RedisCacheConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;

        info!("Redis cache connected to {}", config.url);

        Ok(Self {
            config,
            connection,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Get the full cache key with prefix
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        let raw: Option<String> = conn.get(&full_key).await?;

        match raw {
            Some(encoded) => {
                let value: CachedResponse = serde_json::from_str(&encoded)?;
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Redis cache hit for key: {}", key);
                Ok(Some(value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Redis cache miss for key: {}", key);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration) -> CacheResult<()> {
        let ttl_seconds = ttl.as_secs();
        if ttl_seconds == 0 {
            return Err(CacheError::Store {
                message: "Redis TTL must be at least one second".to_string(),
            });
        }

        let full_key = self.full_key(key);
        let encoded = serde_json::to_string(&value)?;
        let mut conn = self.connection.clone();

        conn.set_ex::<_, _, ()>(&full_key, encoded, ttl_seconds)
            .await?;

        debug!("Set Redis cache key: {} with TTL: {:?}", key, ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn.del(&full_key).await?;
        Ok(deleted > 0)
    }

    async fn stats(&self) -> CacheResult<CacheStoreStats> {
        // Entry count and expiry sweeps live inside Redis; only the local
        // hit/miss counters are reported here
        Ok(CacheStoreStats {
            entries: 0,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_cleanups: 0,
        })
    }
}
