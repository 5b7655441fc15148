//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID)
//! - Build the aggregator, breakers and upstream client from config
//! - Serve until the shutdown signal fires

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::aggregation::Aggregator;
use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::Shutdown;
use crate::upstream::{DependencyError, HttpUpstreamClient, UpstreamClient};

/// Error building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub service_name: Arc<str>,
}

/// HTTP server for the aggregation gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server that calls dependencies over HTTP.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        let client = Arc::new(HttpUpstreamClient::new(&config.upstream)?);
        Self::with_client(config, client)
    }

    /// Create a server with a caller-provided upstream client.
    pub fn with_client(config: GatewayConfig, client: Arc<dyn UpstreamClient>) -> Result<Self, ServerError> {
        let aggregator = Arc::new(Aggregator::from_config(&config, client)?);

        for dep in aggregator.dependencies() {
            tracing::info!(
                dependency = %dep.name,
                base_url = %dep.base_url,
                path = %dep.path,
                "Dependency registered"
            );
        }

        let state = AppState {
            aggregator,
            service_name: Arc::from(config.service_name.as_str()),
        };
        let router = Self::build_router(&config, state.clone());

        Ok(Self { router, config, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/aggregate", get(handlers::aggregate))
            .route("/health", get(handlers::health))
            .route("/breakers", get(handlers::breakers))
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http())
    }

    /// Router with state and middleware applied.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared application state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            dependencies = self.state.aggregator.dependencies().count(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
