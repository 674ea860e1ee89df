//! # Error Handling Module
//!
//! This module defines the error taxonomy for the proxy using the `thiserror`
//! crate and provides the HTTP status code mapping for client responses.
//!
//! Every failure a request can hit is converted into a `ProxyError` at the
//! resolver boundary and rendered as a structured JSON error envelope. A
//! single request's failure never propagates to the process level.

use axum::http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Main result type used throughout the proxy
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Error types for the caching proxy
///
/// Each variant represents a different category of failure. The `#[error]`
/// attribute implements `Display` with the given message.
#[derive(Debug, Error, Clone)]
pub enum ProxyError {
    /// Configuration-related errors (missing token, invalid URL, etc.)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Caller-supplied tag failed validation before normalization
    #[error("Invalid tag: {reason}")]
    InvalidTag { reason: String },

    /// Upstream returned a non-2xx status; relayed verbatim to the client
    #[error("Upstream rejected request with status {status}")]
    UpstreamRejected {
        status: u16,
        body: serde_json::Value,
    },

    /// Upstream returned 429; surfaced with a retry-after hint when present
    #[error("Upstream rate limited")]
    UpstreamRateLimited {
        body: serde_json::Value,
        retry_after: Option<u64>,
    },

    /// No response within the timeout budget after exhausting retries
    #[error("Upstream did not respond within the timeout budget")]
    UpstreamTimeout,

    /// Transport-level failure (DNS, connection refused, reset) after retries
    #[error("Upstream unreachable: {message}")]
    UpstreamUnreachable { message: String },

    /// Cache backend failure; degraded to a miss before it reaches a client
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Internal server errors for unexpected failures
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ProxyError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid-tag error with a custom reason
    pub fn invalid_tag<S: Into<String>>(reason: S) -> Self {
        Self::InvalidTag {
            reason: reason.into(),
        }
    }

    /// Create a cache error with a custom message
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an upstream-unreachable error with a custom message
    pub fn unreachable<S: Into<String>>(message: S) -> Self {
        Self::UpstreamUnreachable {
            message: message.into(),
        }
    }

    /// Get the appropriate HTTP status code for this error
    ///
    /// `UpstreamRejected` carries the upstream's own status so the proxy
    /// forwards it faithfully instead of reinterpreting it.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidTag { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::UpstreamRateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamUnreachable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cache { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be retried
    ///
    /// Only transport-level failures are transient; HTTP-level rejections
    /// from the upstream must never be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout | Self::UpstreamUnreachable { .. }
        )
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::InvalidTag { .. } => "invalid_tag",
            Self::UpstreamRejected { .. } => "upstream_rejected",
            Self::UpstreamRateLimited { .. } => "rate_limited",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::UpstreamUnreachable { .. } => "upstream_unreachable",
            Self::Cache { .. } => "cache_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

/// Implement conversion from reqwest::Error
///
/// Timeouts keep their own variant so the resolver can map them to 504;
/// everything else at the transport level becomes `UpstreamUnreachable`.
impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout
        } else {
            Self::UpstreamUnreachable {
                message: err.to_string(),
            }
        }
    }
}

impl ProxyError {
    /// The JSON body a client sees for this error
    ///
    /// Upstream rejections relay the upstream body verbatim (faithful
    /// forwarding), enriched only with the retry-after hint on 429; all
    /// other variants render the proxy's own envelope. The underlying cause
    /// of internal faults is reduced to a short message so internals never
    /// leak to clients.
    pub fn client_body(&self) -> serde_json::Value {
        match self {
            Self::UpstreamRejected { body, .. } => body.clone(),
            Self::UpstreamRateLimited { body, retry_after } => {
                let mut payload = body.clone();
                if let (Some(secs), Some(obj)) = (retry_after, payload.as_object_mut()) {
                    obj.insert("retryAfter".to_string(), json!(secs));
                }
                payload
            }
            _ => json!({
                "error": {
                    "code": self.status_code().as_u16(),
                    "type": self.error_type(),
                    "message": self.to_string(),
                    "retryable": self.is_retryable(),
                }
            }),
        }
    }
}
