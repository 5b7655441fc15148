//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap dependency calls with the breaker's per-call deadline
//! - Map an elapsed deadline to `CallError::Timeout`
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from transport errors
//! - The deadline is independent of the client's socket timeouts; whichever
//!   fires first ends the call

use std::future::Future;
use std::time::Duration;

use crate::upstream::CallError;

/// Run `call` with a deadline. The inner future is dropped when it elapses.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, CallError>
where
    F: Future<Output = Result<T, CallError>>,
{
    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(CallError::Timeout(deadline)))
}
