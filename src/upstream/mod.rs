//! Upstream dependency subsystem.
//!
//! # Data Flow
//! ```text
//! DependencyConfig[] (startup)
//!     → dependency.rs (immutable Dependency, shared via Arc)
//!
//! Per call:
//!     Dependency + RequestContext
//!     → RequestSpec (rendered path + query)
//!     → client.rs (one GET, socket timeouts)
//!     → JSON body or CallError (error.rs)
//! ```

pub mod client;
pub mod dependency;
pub mod error;

pub use client::{HttpUpstreamClient, UpstreamClient};
pub use dependency::{Dependency, DependencyError, RequestSpec};
pub use error::CallError;
