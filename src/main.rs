//! # Stats Proxy - Main Entry Point
//!
//! Process bootstrap: initialize tracing, load configuration from the
//! environment, select the cache backend, and serve until SIGTERM/SIGINT.
//! A missing API token is fatal here, before the server binds.

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use stats_proxy::cache::{InMemoryCacheConfig, RedisCacheConfig};
use stats_proxy::routes::build_router;
use stats_proxy::{
    CacheBackend, CacheStore, InMemoryCache, ProxyConfig, ProxyError, ProxyResult, RedisCache,
    ResponseResolver, UpstreamClient,
};

#[tokio::main]
async fn main() -> ProxyResult<()> {
    init_observability();

    info!("🚀 Starting stats proxy");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let cache = build_cache(&config).await?;
    let client = UpstreamClient::new(&config)?;
    let resolver = Arc::new(ResponseResolver::new(cache, client, &config));

    let router = build_router(resolver);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| {
            ProxyError::config(format!("Failed to bind {}: {}", config.bind_address, e))
        })?;

    info!("🌐 Proxy ready on {}", config.bind_address);
    info!("Upstream: {}", config.upstream_base_url);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ProxyError::internal(format!("Server error: {}", e)))?;

    info!("✅ Stats proxy shutdown complete");
    Ok(())
}

/// Initialize logging with an env-filter; JSON output for log shipping
fn init_observability() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true).json())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stats_proxy=info,tower_http=debug".into()),
        )
        .init();
}

/// Construct the configured cache backend
async fn build_cache(config: &ProxyConfig) -> ProxyResult<Arc<dyn CacheStore>> {
    match config.cache_backend {
        CacheBackend::Memory => {
            info!("🧠 Using in-memory cache backend");
            Ok(Arc::new(InMemoryCache::new(InMemoryCacheConfig::default())))
        }
        CacheBackend::Redis => {
            info!("📡 Using Redis cache backend");
            let cache = RedisCache::new(RedisCacheConfig {
                url: config.redis_url.clone(),
                ..Default::default()
            })
            .await
            .map_err(|e| ProxyError::config(format!("Failed to connect to Redis: {}", e)))?;
            Ok(Arc::new(cache))
        }
    }
}

/// Resolve on SIGTERM or SIGINT
async fn shutdown_signal() {
    let sigint = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = sigint => info!("📡 Received SIGINT, shutting down"),
        _ = sigterm => info!("📡 Received SIGTERM, shutting down"),
    }
}
