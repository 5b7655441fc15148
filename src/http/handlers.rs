//! Route handlers.

use axum::{
    extract::{RawQuery, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Instant;
use uuid::Uuid;

use crate::aggregation::RequestContext;
use crate::http::request::X_REQUEST_ID;
use crate::http::response::{aggregate_response, health_response, not_found_response};
use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET /aggregate`: fan out to every dependency and merge.
pub async fn aggregate(State(state): State<AppState>, headers: HeaderMap, RawQuery(query): RawQuery) -> Response {
    let start = Instant::now();
    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let params = query
        .as_deref()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect::<Vec<_>>())
        .unwrap_or_default();
    let ctx = RequestContext::new(request_id).with_params(params);

    tracing::info!(request_id = %ctx.request_id, "Received aggregate request");
    let result = state.aggregator.aggregate(&ctx).await;
    let response = aggregate_response(result);

    tracing::info!(
        request_id = %ctx.request_id,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Aggregate request completed"
    );
    metrics::record_request("/aggregate", response.status().as_u16(), start);
    response
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let response = health_response(&state.service_name);
    metrics::record_request("/health", response.status().as_u16(), start);
    response
}

/// `GET /breakers`: current mode of every dependency breaker.
pub async fn breakers(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let response = Json(state.aggregator.breakers().snapshots()).into_response();
    metrics::record_request("/breakers", response.status().as_u16(), start);
    response
}

/// Fallback for unmatched routes.
pub async fn not_found(headers: HeaderMap, uri: axum::http::Uri) -> Response {
    let start = Instant::now();
    tracing::warn!(
        request_id = headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()).unwrap_or("unknown"),
        path = %uri.path(),
        "No route matched"
    );
    let response = not_found_response();
    metrics::record_request("unmatched", response.status().as_u16(), start);
    response
}
