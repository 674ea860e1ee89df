//! # Routes Module
//!
//! The static route table and the thin axum handlers in front of the
//! resolver. Each entry maps an inbound path to an upstream path template,
//! a cacheability flag, and the whitelist of query parameters that pass
//! through. Handlers validate and normalize tags, build the
//! [`ForwardRequest`], and relay the resolver's response.

use crate::core::error::ProxyError;
use crate::core::types::{ClientResponse, ForwardRequest};
use crate::resolver::ResponseResolver;
use crate::tag::{normalize_tag, validate_tag};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Query parameters the upstream accepts on paginated list endpoints.
/// Anything else is dropped rather than forwarded.
const PAGING_PARAMS: &[&str] = &["limit", "before", "after"];

/// Build the proxy's router
pub fn build_router(resolver: Arc<ResponseResolver>) -> Router {
    Router::new()
        .route("/players/:tag", get(get_player))
        .route("/players/:tag/battlelog", get(get_battlelog))
        .route("/clubs/:tag", get(get_club))
        .route("/clubs/:tag/members", get(get_club_members))
        .route("/rankings/:country/players", get(get_player_rankings))
        .route("/rankings/:country/clubs", get(get_club_rankings))
        .route("/events/rotation", get(get_event_rotation))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(resolver)
}

async fn get_player(
    State(resolver): State<Arc<ResponseResolver>>,
    Path(tag): Path<String>,
) -> Response {
    forward_tagged(&resolver, &tag, |tag| format!("/players/{}", tag)).await
}

async fn get_battlelog(
    State(resolver): State<Arc<ResponseResolver>>,
    Path(tag): Path<String>,
) -> Response {
    forward_tagged(&resolver, &tag, |tag| format!("/players/{}/battlelog", tag)).await
}

async fn get_club(
    State(resolver): State<Arc<ResponseResolver>>,
    Path(tag): Path<String>,
) -> Response {
    forward_tagged(&resolver, &tag, |tag| format!("/clubs/{}", tag)).await
}

async fn get_club_members(
    State(resolver): State<Arc<ResponseResolver>>,
    Path(tag): Path<String>,
) -> Response {
    forward_tagged(&resolver, &tag, |tag| format!("/clubs/{}/members", tag)).await
}

async fn get_player_rankings(
    State(resolver): State<Arc<ResponseResolver>>,
    Path(country): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    forward_listing(
        &resolver,
        format!("/rankings/{}/players", country.to_lowercase()),
        &params,
    )
    .await
}

async fn get_club_rankings(
    State(resolver): State<Arc<ResponseResolver>>,
    Path(country): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    forward_listing(
        &resolver,
        format!("/rankings/{}/clubs", country.to_lowercase()),
        &params,
    )
    .await
}

async fn get_event_rotation(State(resolver): State<Arc<ResponseResolver>>) -> Response {
    let path = "/events/rotation".to_string();
    let request = ForwardRequest::get(path.clone(), Some(format!("GET:{}", path)));
    resolver.resolve_to_response(request).await.into_response()
}

async fn health() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

/// Validate and normalize a tag, then forward the templated GET.
/// Rejections render through [`ClientResponse`] so they carry a
/// correlation id like every other response.
async fn forward_tagged<F>(resolver: &ResponseResolver, raw_tag: &str, template: F) -> Response
where
    F: FnOnce(&str) -> String,
{
    if let Err(err) = validate_tag(raw_tag) {
        return ClientResponse::from_error(err, Uuid::new_v4()).into_response();
    }

    let tag = normalize_tag(raw_tag);
    if tag.is_empty() {
        return ClientResponse::from_error(ProxyError::invalid_tag("tag is empty"), Uuid::new_v4())
            .into_response();
    }

    let path = template(&tag);
    let request = ForwardRequest::get(path.clone(), Some(format!("GET:{}", path)));
    resolver.resolve_to_response(request).await.into_response()
}

/// Forward a listing GET, passing through only whitelisted query params.
/// Params are sorted so identical requests share a cache key.
async fn forward_listing(
    resolver: &ResponseResolver,
    base_path: String,
    params: &HashMap<String, String>,
) -> Response {
    let path = listing_path(&base_path, params);
    let request = ForwardRequest::get(path.clone(), Some(format!("GET:{}", path)));
    resolver.resolve_to_response(request).await.into_response()
}

/// Append the whitelisted query parameters to a listing path
fn listing_path(base_path: &str, params: &HashMap<String, String>) -> String {
    let mut allowed: Vec<(&str, &str)> = params
        .iter()
        .filter(|(name, _)| PAGING_PARAMS.contains(&name.as_str()))
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    allowed.sort();

    if allowed.is_empty() {
        return base_path.to_string();
    }

    let query: Vec<String> = allowed
        .iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
        .collect();
    format!("{}?{}", base_path, query.join("&"))
}
