//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Issue exactly one GET per call (no retries)
//! - Bound connect and idle time at the socket layer
//! - Classify the outcome: 2xx body, status error, transport error, decode error

use async_trait::async_trait;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::upstream::dependency::{Dependency, RequestSpec};
use crate::upstream::error::CallError;

/// Issues a single outbound call to one dependency.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Perform the call. A 2xx response yields the decoded JSON body.
    async fn call(&self, dependency: &Dependency, request: &RequestSpec) -> Result<Value, CallError>;
}

/// `reqwest`-backed client shared by every dependency.
#[derive(Debug, Clone)]
pub struct HttpUpstreamClient {
    client: reqwest::Client,
}

impl HttpUpstreamClient {
    /// Build a client with the configured connect and idle timeouts.
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.idle_timeout())
            .pool_idle_timeout(config.idle_timeout())
            .user_agent(concat!("aggregation-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn call(&self, dependency: &Dependency, request: &RequestSpec) -> Result<Value, CallError> {
        let url = dependency.url_for(request);
        tracing::debug!(dependency = %dependency.name, url = %url, "Calling upstream");

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(dependency = %dependency.name, status = %status, "Upstream returned error status");
            return Err(CallError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| CallError::Decode(e.to_string()))
    }
}
