//! # Upstream Client
//!
//! Outbound HTTP to the statistics API. Every request carries the bearer
//! credential and an `Accept: application/json` header, runs under a hard
//! per-attempt timeout, and retries transport-level failures per the
//! [`RetryPolicy`](super::retry::RetryPolicy). HTTP-level error responses
//! are returned as-is for the resolver to relay; they are never retried
//! here.
//!
//! Response bodies that fail to parse as JSON do not fail the call: the raw
//! text is wrapped as `{"raw": <text>}` with the original status preserved.

use super::retry::RetryPolicy;
use crate::core::config::ProxyConfig;
use crate::core::error::{ProxyError, ProxyResult};
use crate::core::types::ForwardMethod;
use reqwest::header::ACCEPT;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// A normalized upstream response: status, decoded body, and the
/// `Retry-After` hint when the upstream sent one
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
    pub retry_after: Option<u64>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for the upstream statistics API
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    retry: RetryPolicy,
}

impl UpstreamClient {
    /// Build a client from the proxy configuration. The per-attempt timeout
    /// is enforced by reqwest; the credential is held here and attached to
    /// every request, never logged.
    pub fn new(config: &ProxyConfig) -> ProxyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProxyError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.upstream_base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    /// Send a request upstream, retrying transport failures with backoff.
    ///
    /// Returns the last transport error once the attempt budget is spent;
    /// timeouts keep their own variant so the resolver maps them to 504.
    pub async fn send(
        &self,
        method: ForwardMethod,
        path: &str,
        body: Option<&Value>,
    ) -> ProxyResult<UpstreamResponse> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 1u32;

        loop {
            match self.attempt(method, &url, body).await {
                Ok(response) => {
                    debug!(
                        method = %method,
                        path = %path,
                        status = response.status,
                        attempt,
                        "Upstream responded"
                    );
                    return Ok(response);
                }
                Err(err) if self.retry.should_retry(attempt, &err) => {
                    let delay = self.retry.backoff_for(attempt);
                    warn!(
                        method = %method,
                        path = %path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Upstream attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One attempt: issue the request and normalize the response
    async fn attempt(
        &self,
        method: ForwardMethod,
        url: &str,
        body: Option<&Value>,
    ) -> ProxyResult<UpstreamResponse> {
        let mut builder = match method {
            ForwardMethod::Get => self.http.get(url),
            ForwardMethod::Post => self.http.post(url),
        };

        builder = builder
            .bearer_auth(&self.api_token)
            .header(ACCEPT, "application/json");

        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));

        Ok(UpstreamResponse {
            status,
            body,
            retry_after,
        })
    }
}
