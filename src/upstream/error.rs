//! Per-call failure taxonomy.

use std::time::Duration;
use thiserror::Error;

/// Why a single dependency call did not produce a value.
///
/// Every variant is terminal for the call that produced it; nothing in the
/// gateway retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Connection, DNS or TLS failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Upstream body could not be decoded as JSON.
    #[error("malformed upstream body: {0}")]
    Decode(String),

    /// The breaker's per-call deadline elapsed first.
    #[error("call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Rejected by an open breaker without being attempted.
    #[error("circuit breaker is open")]
    BreakerOpen,
}

impl CallError {
    /// Short machine-readable tag: `transport`, `status:<code>`, `decode`,
    /// `timeout` or `breaker-open`.
    pub fn tag(&self) -> String {
        match self {
            CallError::Transport(_) => "transport".to_string(),
            CallError::Status(code) => format!("status:{code}"),
            CallError::Decode(_) => "decode".to_string(),
            CallError::Timeout(_) => "timeout".to_string(),
            CallError::BreakerOpen => "breaker-open".to_string(),
        }
    }
}
