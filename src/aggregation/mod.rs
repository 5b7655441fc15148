//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext (context.rs)
//!     → aggregator.rs: one task per dependency
//!         → CircuitBreaker::execute(UpstreamClient::call)
//!     → join all (no first-failure cancellation)
//!     → AggregateResult (result.rs): full payload or every failure
//! ```

pub mod aggregator;
pub mod context;
pub mod result;

pub use aggregator::Aggregator;
pub use context::RequestContext;
pub use result::{AggregateFailure, AggregatePayload, AggregateResult};
