//! Request-aggregation gateway library.
//!
//! One inbound endpoint fans out to several upstream HTTP dependencies, each
//! guarded by its own circuit breaker, and merges the results into a single
//! response.

pub mod aggregation;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;

pub use aggregation::{AggregateResult, Aggregator, RequestContext};
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
