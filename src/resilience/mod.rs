//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dependency call:
//!     → circuit_breaker.rs (admit, reject fast, or admit the Half-Open trial)
//!     → timeouts.rs (enforce the per-call deadline)
//!     → circuit_breaker.rs (record outcome, transition mode)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every dependency call has a deadline
//! - No retries: each admission issues exactly one call
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerMode, BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitBreakers, DependencyFailure,
};
