//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration for the aggregation gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Service name reported by `/health`.
    pub service_name: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Inbound request timeouts.
    pub timeouts: TimeoutConfig,

    /// Outbound client socket timeouts.
    pub upstream: UpstreamConfig,

    /// Default circuit breaker thresholds, applied to every dependency
    /// without its own override.
    pub breaker: BreakerConfig,

    /// Upstream dependencies fanned out to by `/aggregate`.
    pub dependencies: Vec<DependencyConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            service_name: "API Gateway".to_string(),
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            upstream: UpstreamConfig::default(),
            breaker: BreakerConfig::default(),
            dependencies: default_dependencies(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Breaker thresholds for a dependency, honouring its override.
    pub fn breaker_for(&self, dependency: &DependencyConfig) -> BreakerConfig {
        dependency.breaker.clone().unwrap_or_else(|| self.breaker.clone())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on a whole inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Idle/read timeout in milliseconds.
    pub idle_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            idle_timeout_ms: 10_000,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub max_failures: u32,

    /// Per-call deadline enforced by the breaker, in milliseconds.
    pub call_timeout_ms: u64,

    /// Time spent open before a trial call is admitted, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 3,
            call_timeout_ms: 5_000,
            reset_timeout_ms: 10_000,
        }
    }
}

/// A single upstream dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyConfig {
    /// Unique dependency identifier for logging/metrics.
    pub name: String,

    /// Scheme, authority and optional path prefix, e.g. "https://jsonplaceholder.typicode.com".
    pub base_url: String,

    /// Path template; `{param}` placeholders are filled from the inbound
    /// query string, falling back to `params`.
    pub path: String,

    /// Default values for path placeholders.
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Optional fixed query string appended to every call.
    #[serde(default)]
    pub query: Option<String>,

    /// Field read from the upstream JSON object.
    pub extract_field: String,

    /// Key the extracted value is published under in the merged payload.
    pub output_field: String,

    /// Value used when `extract_field` is absent from the upstream body.
    pub fallback: String,

    /// Per-dependency breaker thresholds.
    #[serde(default)]
    pub breaker: Option<BreakerConfig>,
}

fn default_dependencies() -> Vec<DependencyConfig> {
    let id = BTreeMap::from([("id".to_string(), "1".to_string())]);
    vec![
        DependencyConfig {
            name: "post".to_string(),
            base_url: "https://jsonplaceholder.typicode.com".to_string(),
            path: "/posts/{id}".to_string(),
            params: id.clone(),
            query: None,
            extract_field: "title".to_string(),
            output_field: "post_title".to_string(),
            fallback: "Unknown Title".to_string(),
            breaker: None,
        },
        DependencyConfig {
            name: "author".to_string(),
            base_url: "https://jsonplaceholder.typicode.com".to_string(),
            path: "/users/{id}".to_string(),
            params: id,
            query: None,
            extract_field: "name".to_string(),
            output_field: "author_name".to_string(),
            fallback: "Unknown Author".to_string(),
            breaker: None,
        },
    ]
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
