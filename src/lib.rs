//! # Stats Proxy - Core Library Crate
//!
//! A caching reverse proxy for a single upstream game-statistics REST API.
//! The proxy forwards client requests, injects the bearer credential,
//! normalizes player/club tags into the upstream's encoded form, and caches
//! successful GET responses for a short TTL to cut upstream load and
//! latency.
//!
//! ## Architecture
//!
//! - `tag`: canonicalizes user-supplied tags (decode, uppercase, `#`-prefix,
//!   percent-encode), idempotently
//! - `cache`: the `CacheStore` trait with in-memory and Redis backends
//! - `upstream`: the HTTP client with per-attempt timeout and bounded,
//!   transport-only retry
//! - `resolver`: the forwarding core — cache check, upstream fetch,
//!   write-through, outcome-to-response mapping
//! - `routes`: the static route table and thin axum handlers
//! - `core`: configuration, error taxonomy, and shared types

/// Core functionality: error types, configuration, and shared data structures
pub mod core;

/// Tag validation and normalization
pub mod tag;

/// Response caching with pluggable backends
pub mod cache;

/// Upstream HTTP client and retry policy
pub mod upstream;

/// The request-forwarding and caching core
pub mod resolver;

/// Route table and HTTP handlers
pub mod routes;

// Re-export commonly used types for easier access
pub use crate::core::config::{CacheBackend, ProxyConfig, RetryConfig};
pub use crate::core::error::{ProxyError, ProxyResult};
pub use crate::core::types::{ClientResponse, ForwardMethod, ForwardOutcome, ForwardRequest};
pub use cache::{CacheStore, CachedResponse, InMemoryCache, RedisCache};
pub use resolver::ResponseResolver;
pub use upstream::{RetryPolicy, UpstreamClient};
