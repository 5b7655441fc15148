//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, latency, dependency outcomes, breakers)
//! - Expose Prometheus-compatible metrics endpoint
//! - Track per-dependency and aggregate metrics
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by route, status
//! - `gateway_request_duration_seconds` (histogram): inbound latency
//! - `gateway_dependency_calls_total` (counter): calls by dependency, outcome
//! - `gateway_dependency_call_duration_seconds` (histogram): call latency
//! - `gateway_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_breaker_transitions_total` (counter): transitions by target mode
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - Labels for route, dependency, status code and outcome tag

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::resilience::BreakerMode;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one inbound request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one dependency call outcome (`success` or a `CallError` tag).
pub fn record_dependency_call(dependency: &str, outcome: &str, elapsed: Duration) {
    counter!(
        "gateway_dependency_calls_total",
        "dependency" => dependency.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    if !elapsed.is_zero() {
        histogram!(
            "gateway_dependency_call_duration_seconds",
            "dependency" => dependency.to_string()
        )
        .record(elapsed.as_secs_f64());
    }
}

/// Record a breaker transition and its new mode.
pub fn record_breaker_transition(dependency: &str, to: BreakerMode) {
    counter!(
        "gateway_breaker_transitions_total",
        "dependency" => dependency.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("gateway_breaker_state", "dependency" => dependency.to_string()).set(breaker_gauge(to));
}

fn breaker_gauge(mode: BreakerMode) -> f64 {
    match mode {
        BreakerMode::Closed => 0.0,
        BreakerMode::HalfOpen => 1.0,
        BreakerMode::Open => 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_values_order_by_severity() {
        assert!(breaker_gauge(BreakerMode::Closed) < breaker_gauge(BreakerMode::HalfOpen));
        assert!(breaker_gauge(BreakerMode::HalfOpen) < breaker_gauge(BreakerMode::Open));
    }

    #[test]
    fn recording_without_exporter_is_noop() {
        record_request("/aggregate", 200, Instant::now());
        record_dependency_call("post", "success", Duration::from_millis(3));
        record_breaker_transition("post", BreakerMode::Open);
    }
}
