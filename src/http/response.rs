//! Response bodies and status mapping.
//!
//! # Responsibilities
//! - Map an `AggregateResult` to 200 or 500 with a JSON body
//! - Build the health and not-found bodies
//!
//! # Design Decisions
//! - Never a partial 200: any dependency failure is a 500
//! - Error bodies carry every failed dependency, not just the first
//! - Timestamps are milliseconds since the Unix epoch

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::aggregation::{AggregateFailure, AggregateResult};
use crate::resilience::{BreakerMode, DependencyFailure};

pub const AGGREGATE_ERROR: &str = "Failed to fetch data from external APIs";
pub const ROUTE_NOT_FOUND: &str = "Route not found";

/// Body of a failed `/aggregate`.
#[derive(Debug, Serialize)]
pub struct AggregateErrorBody {
    pub error: &'static str,
    pub message: String,
    pub timestamp: u64,
    pub failures: Vec<FailureEntry>,
}

/// One failed dependency within an error body.
#[derive(Debug, Serialize)]
pub struct FailureEntry {
    pub dependency: String,
    /// Short tag, e.g. `status:503` or `breaker-open`.
    pub cause: String,
    pub message: String,
    pub breaker: BreakerMode,
}

impl From<&DependencyFailure> for FailureEntry {
    fn from(failure: &DependencyFailure) -> Self {
        Self {
            dependency: failure.dependency.clone(),
            cause: failure.error.tag(),
            message: failure.error.to_string(),
            breaker: failure.mode,
        }
    }
}

impl AggregateErrorBody {
    pub fn from_failure(failure: &AggregateFailure) -> Self {
        Self {
            error: AGGREGATE_ERROR,
            message: failure.message(),
            timestamp: now_millis(),
            failures: failure.failures.iter().map(FailureEntry::from).collect(),
        }
    }
}

/// Body of `/health`.
#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub timestamp: u64,
    pub service: String,
}

#[derive(Debug, Serialize)]
struct NotFoundBody {
    error: &'static str,
}

/// 200 with the merged payload, or 500 with every failure.
pub fn aggregate_response(result: AggregateResult) -> Response {
    match result {
        AggregateResult::Success(payload) => (StatusCode::OK, Json(Value::Object(payload))).into_response(),
        AggregateResult::Failure(failure) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AggregateErrorBody::from_failure(&failure)),
        )
            .into_response(),
    }
}

pub fn health_response(service: &str) -> Response {
    Json(HealthBody {
        status: "UP",
        timestamp: now_millis(),
        service: service.to_string(),
    })
    .into_response()
}

pub fn not_found_response() -> Response {
    (StatusCode::NOT_FOUND, Json(NotFoundBody { error: ROUTE_NOT_FOUND })).into_response()
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
