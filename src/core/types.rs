//! # Core Types Module
//!
//! Data structures shared across the proxy: the logical request handed to
//! the response resolver, the discriminated outcome of forwarding it, and
//! the client-facing response tuple.

use crate::core::error::ProxyError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use uuid::Uuid;

/// HTTP methods the proxy forwards. Only these two appear in the route
/// table; anything else is rejected at the routing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardMethod {
    Get,
    Post,
}

impl ForwardMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for ForwardMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical request to forward upstream
///
/// Built per inbound request by the route layer with the tag already
/// normalized and any allowed query string appended, then consumed exactly
/// once by the resolver.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// HTTP method to use upstream
    pub method: ForwardMethod,

    /// Upstream path with normalized identifiers and query string
    pub upstream_path: String,

    /// JSON body, present only for POST
    pub body: Option<Value>,

    /// Logical cache identity; `None` means "never cache this request"
    pub cache_key: Option<String>,
}

impl ForwardRequest {
    /// A cacheable GET request
    pub fn get<S: Into<String>>(upstream_path: S, cache_key: Option<String>) -> Self {
        Self {
            method: ForwardMethod::Get,
            upstream_path: upstream_path.into(),
            body: None,
            cache_key,
        }
    }

    /// A POST request; never cached regardless of `cache_key`
    pub fn post<S: Into<String>>(upstream_path: S, body: Value) -> Self {
        Self {
            method: ForwardMethod::Post,
            upstream_path: upstream_path.into(),
            body: Some(body),
            cache_key: None,
        }
    }
}

/// Outcome of forwarding one request. Exactly one variant is produced per
/// request; every variant terminates in a determinate client response.
#[derive(Debug, Clone)]
pub enum ForwardOutcome {
    /// Served from the cache without touching the upstream
    CachedHit { status: u16, body: Value },

    /// Upstream answered with a 2xx status
    UpstreamSuccess { status: u16, body: Value },

    /// Upstream answered with a non-2xx status; relayed verbatim
    UpstreamError {
        status: u16,
        body: Value,
        retry_after: Option<u64>,
    },

    /// No response within the timeout budget after exhausting retries
    Timeout,

    /// Transport-level failure after exhausting retries
    TransportFailure { message: String },

    /// A fault inside the proxy itself; the upstream may never have been
    /// reached
    InternalFault { message: String },
}

/// The client-facing result of a forwarded request: a status code, a JSON
/// body, and a correlation id for log correlation.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub body: Value,
    pub request_id: Uuid,
}

impl ClientResponse {
    /// Map a forwarding outcome to the client-visible (status, body) pair.
    ///
    /// Faithful-forward paths keep the upstream status and body untouched
    /// apart from documented enrichment (retry-after hint on 429). Failure
    /// paths render through the [`ProxyError`] taxonomy so every error a
    /// client sees shares one envelope.
    pub fn from_outcome(outcome: ForwardOutcome, request_id: Uuid) -> Self {
        match outcome {
            ForwardOutcome::CachedHit { status, body }
            | ForwardOutcome::UpstreamSuccess { status, body } => Self {
                status: StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
                body,
                request_id,
            },
            ForwardOutcome::UpstreamError {
                status: 429,
                body,
                retry_after,
            } => Self::from_error(ProxyError::UpstreamRateLimited { body, retry_after }, request_id),
            ForwardOutcome::UpstreamError { status, body, .. } => {
                Self::from_error(ProxyError::UpstreamRejected { status, body }, request_id)
            }
            ForwardOutcome::Timeout => Self::from_error(ProxyError::UpstreamTimeout, request_id),
            ForwardOutcome::TransportFailure { message } => {
                Self::from_error(ProxyError::UpstreamUnreachable { message }, request_id)
            }
            ForwardOutcome::InternalFault { message } => {
                Self::from_error(ProxyError::Internal { message }, request_id)
            }
        }
    }

    /// Render a proxy error as the client response
    pub fn from_error(error: ProxyError, request_id: Uuid) -> Self {
        Self {
            status: error.status_code(),
            body: error.client_body(),
            request_id,
        }
    }
}

impl IntoResponse for ClientResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if let Ok(value) = self.request_id.to_string().parse() {
            response.headers_mut().insert("x-request-id", value);
        }
        response
    }
}
