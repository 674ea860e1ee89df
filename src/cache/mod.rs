//! # Cache Module
//!
//! Time-bounded response caching for the proxy. A cache value is the pair
//! of (upstream status, decoded JSON body); entries expire `ttl` after the
//! write and an expired entry is indistinguishable from a never-written key.
//!
//! Two backends implement the [`CacheStore`] trait: an in-process
//! [`InMemoryCache`] and a shared [`RedisCache`]. Backend failures surface
//! as [`CacheError`] and are degraded to cache misses by the resolver, never
//! propagated to clients.

pub mod memory;
pub mod redis_store;

pub use memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis_store::{RedisCache, RedisCacheConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache operation result
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache store error: {message}")]
    Store { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// A cached upstream response: the status code and decoded body exactly as
/// they would have been relayed to the client on the original request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl CachedResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self { status, body }
    }
}

/// Trait for cache store implementations
///
/// Implementations must be safe to share across concurrent forwarding
/// operations: concurrent `get`/`set` on the same or different keys never
/// corrupt state, and key collisions resolve last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value from the cache; expired entries behave as absent
    async fn get(&self, key: &str) -> CacheResult<Option<CachedResponse>>;

    /// Set a value in the cache, expiring `ttl` from now
    async fn set(&self, key: &str, value: CachedResponse, ttl: Duration) -> CacheResult<()>;

    /// Delete a value from the cache, returning whether it existed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// Get cache statistics
    async fn stats(&self) -> CacheResult<CacheStoreStats>;
}

/// Cache store statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStoreStats {
    /// Number of live entries
    pub entries: usize,

    /// Number of hits
    pub hits: u64,

    /// Number of misses
    pub misses: u64,

    /// Number of expired entries cleaned up
    pub expired_cleanups: u64,
}
