//! Merged outcome of one aggregation.

use serde_json::{Map, Value};

use crate::resilience::DependencyFailure;

/// Success payload: output field → extracted value.
pub type AggregatePayload = Map<String, Value>;

/// Outcome of one inbound request's fan-out.
///
/// Success requires every dependency to succeed; there is no partial payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateResult {
    Success(AggregatePayload),
    Failure(AggregateFailure),
}

impl AggregateResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AggregateResult::Success(_))
    }
}

/// Every failed dependency of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateFailure {
    /// Failures sorted by dependency name.
    pub failures: Vec<DependencyFailure>,
    /// Dependencies that completed successfully, sorted by name.
    pub succeeded: Vec<String>,
}

impl AggregateFailure {
    /// Human-readable summary of all causes.
    pub fn message(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn failed(&self, dependency: &str) -> Option<&DependencyFailure> {
        self.failures.iter().find(|f| f.dependency == dependency)
    }
}
