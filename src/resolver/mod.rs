//! # Response Resolver
//!
//! The forwarding core. Given a [`ForwardRequest`] the resolver checks the
//! cache (GET with a cache key only), invokes the upstream client on a
//! miss, writes successful GET responses through to the cache, and maps
//! every outcome to a determinate client response. No failure propagates
//! past this boundary.
//!
//! The cache store is an injected dependency rather than process-global
//! state, so tests get a fresh store per case and backends swap without
//! touching call sites. A cache backend failure is degraded to a miss and
//! logged; it never fails the request.
//!
//! Per-request state machine:
//! `Received → CacheCheck → {CacheHit → Respond} | {CacheMiss → Upstream →
//! {Success → MaybeCache → Respond} | {Error | Timeout | TransportFailure →
//! Respond}}`. Retries are internal to the upstream client and invisible
//! here.

use crate::cache::{CacheStore, CachedResponse};
use crate::core::config::ProxyConfig;
use crate::core::error::ProxyError;
use crate::core::types::{ClientResponse, ForwardMethod, ForwardOutcome, ForwardRequest};
use crate::upstream::UpstreamClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Orchestrates cache lookup, upstream invocation, and cache population
pub struct ResponseResolver {
    cache: Arc<dyn CacheStore>,
    client: UpstreamClient,
    cache_ttl: Duration,
    cache_rate_limited: bool,
}

impl ResponseResolver {
    pub fn new(cache: Arc<dyn CacheStore>, client: UpstreamClient, config: &ProxyConfig) -> Self {
        Self {
            cache,
            client,
            cache_ttl: config.cache_ttl,
            cache_rate_limited: config.cache_rate_limited,
        }
    }

    /// Resolve a request end to end and render the client response,
    /// stamping a fresh correlation id
    pub async fn resolve_to_response(&self, request: ForwardRequest) -> ClientResponse {
        let request_id = Uuid::new_v4();
        let method = request.method;
        let path = request.upstream_path.clone();

        let outcome = self.resolve(request).await;

        info!(
            %request_id,
            method = %method,
            path = %path,
            outcome = outcome_name(&outcome),
            "Request resolved"
        );

        ClientResponse::from_outcome(outcome, request_id)
    }

    /// Resolve a request to exactly one [`ForwardOutcome`]
    pub async fn resolve(&self, request: ForwardRequest) -> ForwardOutcome {
        // Cache check strictly precedes the upstream call. Only GETs with a
        // cache key participate; POSTs never read from the cache.
        if let Some(key) = cacheable_key(&request) {
            match self.cache.get(key).await {
                Ok(Some(cached)) => {
                    debug!(key, "Cache hit");
                    return ForwardOutcome::CachedHit {
                        status: cached.status,
                        body: cached.body,
                    };
                }
                Ok(None) => debug!(key, "Cache miss"),
                Err(err) => {
                    // Degrade to a miss; the cache must never fail a request
                    warn!(key, error = %err, "Cache lookup failed, treating as miss");
                }
            }
        }

        match self
            .client
            .send(request.method, &request.upstream_path, request.body.as_ref())
            .await
        {
            Ok(response) if response.is_success() => {
                if let Some(key) = cacheable_key(&request) {
                    self.write_through(key, response.status, &response.body).await;
                }
                ForwardOutcome::UpstreamSuccess {
                    status: response.status,
                    body: response.body,
                }
            }
            Ok(response) => {
                // Relayed verbatim; only the documented 429 variant may cache
                if response.status == 429 && self.cache_rate_limited {
                    if let Some(key) = cacheable_key(&request) {
                        self.write_through(key, response.status, &response.body).await;
                    }
                }
                ForwardOutcome::UpstreamError {
                    status: response.status,
                    body: response.body,
                    retry_after: response.retry_after,
                }
            }
            Err(ProxyError::UpstreamTimeout) => ForwardOutcome::Timeout,
            Err(ProxyError::UpstreamUnreachable { message }) => {
                ForwardOutcome::TransportFailure { message }
            }
            Err(err) => {
                // Unexpected internal fault; keep the client message short
                warn!(error = %err, "Internal fault while forwarding");
                ForwardOutcome::InternalFault {
                    message: "Internal error while contacting upstream".to_string(),
                }
            }
        }
    }

    /// Populate the cache, tolerating backend failures
    async fn write_through(&self, key: &str, status: u16, body: &serde_json::Value) {
        let value = CachedResponse::new(status, body.clone());
        if let Err(err) = self.cache.set(key, value, self.cache_ttl).await {
            warn!(key, error = %err, "Cache write failed");
        } else {
            debug!(key, ttl_secs = self.cache_ttl.as_secs(), "Cached response");
        }
    }
}

/// The cache key, if this request participates in caching at all
fn cacheable_key(request: &ForwardRequest) -> Option<&str> {
    match request.method {
        ForwardMethod::Get => request.cache_key.as_deref(),
        ForwardMethod::Post => None,
    }
}

fn outcome_name(outcome: &ForwardOutcome) -> &'static str {
    match outcome {
        ForwardOutcome::CachedHit { .. } => "cached_hit",
        ForwardOutcome::UpstreamSuccess { .. } => "upstream_success",
        ForwardOutcome::UpstreamError { .. } => "upstream_error",
        ForwardOutcome::Timeout => "timeout",
        ForwardOutcome::TransportFailure { .. } => "transport_failure",
        ForwardOutcome::InternalFault { .. } => "internal_fault",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CacheResult, CacheStoreStats, InMemoryCache, InMemoryCacheConfig};
    use crate::core::config::RetryConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A cache whose every operation fails, for degraded-mode tests
    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<CachedResponse>> {
            Err(CacheError::Store {
                message: "backend down".to_string(),
            })
        }

        async fn set(
            &self,
            _key: &str,
            _value: CachedResponse,
            _ttl: Duration,
        ) -> CacheResult<()> {
            Err(CacheError::Store {
                message: "backend down".to_string(),
            })
        }

        async fn delete(&self, _key: &str) -> CacheResult<bool> {
            Err(CacheError::Store {
                message: "backend down".to_string(),
            })
        }

        async fn stats(&self) -> CacheResult<CacheStoreStats> {
            Ok(CacheStoreStats::default())
        }
    }

    fn test_config(base_url: String) -> ProxyConfig {
        ProxyConfig {
            upstream_base_url: base_url,
            api_token: "test-token".to_string(),
            request_timeout: Duration::from_millis(250),
            retry: RetryConfig {
                max_attempts: 2,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
            },
            cache_ttl: Duration::from_secs(60),
            ..Default::default()
        }
    }

    fn resolver_with(cache: Arc<dyn CacheStore>, config: &ProxyConfig) -> ResponseResolver {
        let client = UpstreamClient::new(config).unwrap();
        ResponseResolver::new(cache, client, config)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fresh": true})))
            .expect(0) // a hit must not reach the upstream
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        cache
            .set(
                "GET:/players/%232PP00",
                CachedResponse::new(200, json!({"cached": true})),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let resolver = resolver_with(cache, &config);
        let outcome = resolver
            .resolve(ForwardRequest::get(
                "/players/%232PP00",
                Some("GET:/players/%232PP00".to_string()),
            ))
            .await;

        match outcome {
            ForwardOutcome::CachedHit { status, body } => {
                assert_eq!(status, 200);
                assert_eq!(body["cached"], true);
            }
            other => panic!("expected CachedHit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_miss_fetches_and_populates_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/players/%232PP00"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"tag": "#2PP00", "name": "Test"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let cache: Arc<InMemoryCache> = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache.clone(), &config);

        let request = ForwardRequest::get(
            "/players/%232PP00",
            Some("GET:/players/%232PP00".to_string()),
        );
        let outcome = resolver.resolve(request.clone()).await;
        assert!(matches!(outcome, ForwardOutcome::UpstreamSuccess { status: 200, .. }));

        // Second identical request is a hit; wiremock's expect(1) verifies
        // the upstream saw exactly one call
        let outcome = resolver.resolve(request).await;
        match outcome {
            ForwardOutcome::CachedHit { body, .. } => assert_eq!(body["name"], "Test"),
            other => panic!("expected CachedHit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_errors_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/players/%23GONE"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"reason": "notFound"})))
            .expect(2) // both requests must re-hit the upstream
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache, &config);

        let request =
            ForwardRequest::get("/players/%23GONE", Some("GET:/players/%23GONE".to_string()));
        for _ in 0..2 {
            let outcome = resolver.resolve(request.clone()).await;
            assert!(matches!(
                outcome,
                ForwardOutcome::UpstreamError { status: 404, .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_post_never_touches_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rankings/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(2)
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let cache: Arc<InMemoryCache> = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache.clone(), &config);

        // Even a supplied cache key must be ignored for POST
        let mut request = ForwardRequest::post("/rankings/query", json!({"limit": 10}));
        request.cache_key = Some("POST:/rankings/query".to_string());

        for _ in 0..2 {
            let outcome = resolver.resolve(request.clone()).await;
            assert!(matches!(outcome, ForwardOutcome::UpstreamSuccess { .. }));
        }

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_cache_failure_degrades_to_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let resolver = resolver_with(Arc::new(FailingStore), &config);

        let outcome = resolver
            .resolve(ForwardRequest::get(
                "/players/%232PP00",
                Some("GET:/players/%232PP00".to_string()),
            ))
            .await;

        // Lookup and write-through both failed, the request still succeeds
        assert!(matches!(outcome, ForwardOutcome::UpstreamSuccess { .. }));
    }

    #[tokio::test]
    async fn test_rate_limited_not_cached_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "4")
                    .set_body_json(json!({"reason": "requestThrottled"})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache, &config);

        let request =
            ForwardRequest::get("/players/%232PP00", Some("key".to_string()));
        for _ in 0..2 {
            let outcome = resolver.resolve(request.clone()).await;
            assert!(matches!(
                outcome,
                ForwardOutcome::UpstreamError {
                    status: 429,
                    retry_after: Some(4),
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_rate_limited_cached_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"reason": "requestThrottled"})),
            )
            .expect(1) // second request served from cache
            .mount(&server)
            .await;

        let config = ProxyConfig {
            cache_rate_limited: true,
            ..test_config(server.uri())
        };
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache, &config);

        let request = ForwardRequest::get("/players/%232PP00", Some("key".to_string()));

        let outcome = resolver.resolve(request.clone()).await;
        assert!(matches!(outcome, ForwardOutcome::UpstreamError { status: 429, .. }));

        let outcome = resolver.resolve(request).await;
        assert!(matches!(outcome, ForwardOutcome::CachedHit { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_timeout_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(2000)))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache, &config);

        let outcome = resolver
            .resolve(ForwardRequest::get("/players/%232PP00", None))
            .await;
        assert!(matches!(outcome, ForwardOutcome::Timeout));
    }

    #[tokio::test]
    async fn test_transport_failure_outcome() {
        let config = test_config("http://127.0.0.1:9".to_string());
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache, &config);

        let outcome = resolver
            .resolve(ForwardRequest::get("/players/%232PP00", None))
            .await;
        assert!(matches!(outcome, ForwardOutcome::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_response_carries_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let config = test_config(server.uri());
        let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
        let resolver = resolver_with(cache, &config);

        let first = resolver
            .resolve_to_response(ForwardRequest::get("/a", None))
            .await;
        let second = resolver
            .resolve_to_response(ForwardRequest::get("/a", None))
            .await;

        assert_ne!(first.request_id, second.request_id);
    }
}
