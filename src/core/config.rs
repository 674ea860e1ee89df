//! # Configuration Module
//!
//! Typed configuration for the proxy, loaded from environment variables at
//! startup. Values cover the upstream endpoint and credential, the outbound
//! timeout/retry budget, and the cache backend selection.
//!
//! The bearer token is required: a missing or empty token is a fatal startup
//! condition, reported as a `Configuration` error before the server binds.

use crate::core::error::{ProxyError, ProxyResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Selects which backend the cache store uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process DashMap store
    Memory,
    /// Shared Redis store
    Redis,
}

/// Retry policy knobs for the upstream client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request (first try included)
    pub max_attempts: u32,

    /// Base delay between attempts; grows with the attempt number
    pub base_delay: Duration,

    /// Ceiling on the backoff delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(2),
        }
    }
}

/// Top-level proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Base URL of the upstream statistics API
    pub upstream_base_url: String,

    /// Bearer credential attached to every upstream request.
    /// Never logged and never echoed back to clients.
    #[serde(skip_serializing, default)]
    pub api_token: String,

    /// Address the HTTP server binds to
    pub bind_address: String,

    /// Per-attempt timeout for upstream calls
    pub request_timeout: Duration,

    /// Retry policy for transport-level failures
    pub retry: RetryConfig,

    /// TTL applied to cached GET responses
    pub cache_ttl: Duration,

    /// Which cache backend to use
    pub cache_backend: CacheBackend,

    /// Redis connection URL (used when `cache_backend` is `Redis`)
    pub redis_url: String,

    /// Cache 429 responses as well as 2xx ones (off by default)
    pub cache_rate_limited: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_base_url: "https://api.brawlstars.com/v1".to_string(),
            api_token: String::new(),
            bind_address: "0.0.0.0:3000".to_string(),
            request_timeout: Duration::from_millis(8000),
            retry: RetryConfig::default(),
            cache_ttl: Duration::from_secs(120),
            cache_backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            cache_rate_limited: false,
        }
    }
}

impl ProxyConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for everything except the API token.
    pub fn from_env() -> ProxyResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("UPSTREAM_BASE_URL") {
            config.upstream_base_url = url;
        }
        config.api_token = std::env::var("UPSTREAM_API_TOKEN").unwrap_or_default();

        if let Ok(addr) = std::env::var("PROXY_BIND_ADDR") {
            config.bind_address = addr;
        }
        if let Ok(ms) = std::env::var("UPSTREAM_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| ProxyError::config(format!("Invalid UPSTREAM_TIMEOUT_MS: {}", ms)))?;
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Ok(attempts) = std::env::var("UPSTREAM_RETRY_ATTEMPTS") {
            config.retry.max_attempts = attempts.parse().map_err(|_| {
                ProxyError::config(format!("Invalid UPSTREAM_RETRY_ATTEMPTS: {}", attempts))
            })?;
        }
        if let Ok(secs) = std::env::var("CACHE_TTL_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| ProxyError::config(format!("Invalid CACHE_TTL_SECS: {}", secs)))?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Ok(backend) = std::env::var("CACHE_BACKEND") {
            config.cache_backend = match backend.to_lowercase().as_str() {
                "memory" => CacheBackend::Memory,
                "redis" => CacheBackend::Redis,
                other => {
                    return Err(ProxyError::config(format!(
                        "Unknown CACHE_BACKEND: {}",
                        other
                    )))
                }
            };
        }
        if let Ok(url) = std::env::var("REDIS_URL") {
            config.redis_url = url;
        }
        if let Ok(flag) = std::env::var("CACHE_RATE_LIMITED") {
            config.cache_rate_limited = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> ProxyResult<()> {
        if self.api_token.trim().is_empty() {
            return Err(ProxyError::config(
                "UPSTREAM_API_TOKEN is required and must not be empty",
            ));
        }

        url::Url::parse(&self.upstream_base_url)
            .map_err(|e| ProxyError::config(format!("Invalid upstream base URL: {}", e)))?;

        if self.request_timeout.is_zero() {
            return Err(ProxyError::config("Request timeout must be non-zero"));
        }
        if self.cache_ttl.is_zero() {
            return Err(ProxyError::config("Cache TTL must be non-zero"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ProxyError::config("Retry attempts must be at least 1"));
        }

        Ok(())
    }
}
