//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a single trial call tests whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= max_failures
//! Open → Half-Open: first call attempt after reset_timeout
//! Half-Open → Closed: trial call succeeds (counter reset)
//! Half-Open → Open: trial call fails (reset timer restarted)
//! ```
//!
//! # Design Decisions
//! - Per-dependency circuit breaker (not global)
//! - Fail fast in Open state (no waiting for timeout)
//! - Single trial in Half-Open; concurrent callers are rejected, not queued
//! - All mode/counter/timestamp mutations happen under one mutex
//! - A call that misses its deadline is a failure, even if the transport
//!   would have succeeded later

use dashmap::DashMap;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;
use crate::upstream::{CallError, Dependency};

/// Breaker mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerMode {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerMode::Closed => "CLOSED",
            BreakerMode::Open => "OPEN",
            BreakerMode::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for BreakerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub max_failures: u32,
    pub call_timeout: Duration,
    pub reset_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self::from(&BreakerConfig::default())
    }
}

impl From<&BreakerConfig> for BreakerSettings {
    fn from(config: &BreakerConfig) -> Self {
        Self {
            max_failures: config.max_failures.max(1),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            reset_timeout: Duration::from_millis(config.reset_timeout_ms),
        }
    }
}

/// A failed dependency call, annotated with the breaker mode it failed in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{dependency}: {error} (breaker {mode})")]
pub struct DependencyFailure {
    pub dependency: String,
    pub mode: BreakerMode,
    pub error: CallError,
}

/// Point-in-time view of one breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub dependency: String,
    pub mode: BreakerMode,
    pub consecutive_failures: u32,
    pub trial_in_flight: bool,
    /// Milliseconds since the breaker last opened, while Open.
    pub open_for_ms: Option<u64>,
    /// Milliseconds since the last recorded failure.
    pub last_failure_ms_ago: Option<u64>,
}

#[derive(Debug)]
struct BreakerState {
    mode: BreakerMode,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    trial_in_flight: bool,
}

/// How a call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Admitted while Closed.
    Normal,
    /// The single Half-Open trial.
    Trial,
}

/// Circuit breaker guarding one dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            state: Mutex::new(BreakerState {
                mode: BreakerMode::Closed,
                consecutive_failures: 0,
                opened_at: None,
                last_failure_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> BreakerSettings {
        self.settings
    }

    /// Current mode. Does not perform the Open → Half-Open transition.
    pub fn mode(&self) -> BreakerMode {
        self.lock().mode
    }

    /// Run `thunk` under breaker protection.
    ///
    /// Rejected calls never invoke `thunk`. Admitted calls are bounded by the
    /// per-call timeout and their outcome drives the state machine.
    pub async fn execute<T, F, Fut>(&self, thunk: F) -> Result<T, DependencyFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let admission = match self.admit() {
            Ok(admission) => admission,
            Err(mode) => {
                tracing::debug!(dependency = %self.name, mode = %mode, "Call rejected by circuit breaker");
                metrics::record_dependency_call(&self.name, "breaker-open", Duration::ZERO);
                return Err(self.failure(mode, CallError::BreakerOpen));
            }
        };

        let mode = match admission {
            Admission::Normal => BreakerMode::Closed,
            Admission::Trial => BreakerMode::HalfOpen,
        };
        let mut permit = CallPermit {
            breaker: self,
            admission,
            settled: false,
        };

        let start = Instant::now();
        let outcome = with_deadline(self.settings.call_timeout, thunk()).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(value) => {
                permit.settle(true);
                metrics::record_dependency_call(&self.name, "success", elapsed);
                Ok(value)
            }
            Err(error) => {
                permit.settle(false);
                tracing::warn!(
                    dependency = %self.name,
                    mode = %mode,
                    cause = %error.tag(),
                    error = %error,
                    "Dependency call failed"
                );
                metrics::record_dependency_call(&self.name, &error.tag(), elapsed);
                Err(self.failure(mode, error))
            }
        }
    }

    /// Point-in-time view of the breaker.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.lock();
        let now = Instant::now();
        BreakerSnapshot {
            dependency: self.name.clone(),
            mode: state.mode,
            consecutive_failures: state.consecutive_failures,
            trial_in_flight: state.trial_in_flight,
            open_for_ms: match state.mode {
                BreakerMode::Open => state.opened_at.map(|t| millis(now - t)),
                _ => None,
            },
            last_failure_ms_ago: state.last_failure_at.map(|t| millis(now - t)),
        }
    }

    /// Decide whether a call may proceed. `Err` carries the rejecting mode.
    fn admit(&self) -> Result<Admission, BreakerMode> {
        let mut state = self.lock();
        let mode = state.mode;
        match mode {
            BreakerMode::Closed => Ok(Admission::Normal),
            BreakerMode::Open => {
                let ready = state
                    .opened_at
                    .map_or(true, |t| t.elapsed() >= self.settings.reset_timeout);
                if !ready {
                    return Err(BreakerMode::Open);
                }
                state.mode = BreakerMode::HalfOpen;
                state.trial_in_flight = true;
                drop(state);
                self.on_transition(BreakerMode::HalfOpen);
                Ok(Admission::Trial)
            }
            // HALF_OPEN always has its trial in flight: it is only entered
            // with a trial admitted, and settling that trial leaves it.
            BreakerMode::HalfOpen => Err(BreakerMode::HalfOpen),
        }
    }

    fn record_success(&self, admission: Admission) {
        let mut state = self.lock();
        match (admission, state.mode) {
            (Admission::Trial, BreakerMode::HalfOpen) => {
                state.mode = BreakerMode::Closed;
                state.consecutive_failures = 0;
                state.opened_at = None;
                state.trial_in_flight = false;
                drop(state);
                self.on_transition(BreakerMode::Closed);
            }
            (Admission::Normal, BreakerMode::Closed) => {
                state.consecutive_failures = 0;
            }
            // Admitted under an earlier mode; only the trial resolves Half-Open.
            _ => {}
        }
    }

    fn record_failure(&self, admission: Admission) {
        let mut state = self.lock();
        let now = Instant::now();
        state.last_failure_at = Some(now);
        match (admission, state.mode) {
            (Admission::Trial, BreakerMode::HalfOpen) => {
                state.mode = BreakerMode::Open;
                state.opened_at = Some(now);
                state.trial_in_flight = false;
                drop(state);
                self.on_transition(BreakerMode::Open);
            }
            (Admission::Normal, BreakerMode::Closed) => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.settings.max_failures {
                    state.mode = BreakerMode::Open;
                    state.opened_at = Some(now);
                    drop(state);
                    self.on_transition(BreakerMode::Open);
                }
            }
            _ => {}
        }
    }

    fn on_transition(&self, to: BreakerMode) {
        match to {
            BreakerMode::Open => tracing::warn!(
                dependency = %self.name,
                reset_timeout_ms = millis(self.settings.reset_timeout),
                "Circuit breaker opened"
            ),
            BreakerMode::HalfOpen => {
                tracing::info!(dependency = %self.name, "Circuit breaker half-open, admitting trial call")
            }
            BreakerMode::Closed => tracing::info!(dependency = %self.name, "Circuit breaker closed"),
        }
        metrics::record_breaker_transition(&self.name, to);
    }

    fn failure(&self, mode: BreakerMode, error: CallError) -> DependencyFailure {
        DependencyFailure {
            dependency: self.name.clone(),
            mode,
            error,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Tracks an admitted call until its outcome is recorded.
///
/// Dropping an unsettled trial permit (the caller was cancelled) counts as a
/// failed trial so the breaker cannot stay Half-Open forever.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    admission: Admission,
    settled: bool,
}

impl CallPermit<'_> {
    fn settle(&mut self, success: bool) {
        self.settled = true;
        if success {
            self.breaker.record_success(self.admission);
        } else {
            self.breaker.record_failure(self.admission);
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Trial {
            tracing::debug!(dependency = %self.breaker.name, "Trial call abandoned");
            self.breaker.record_failure(Admission::Trial);
        }
    }
}

/// Breakers for every dependency, keyed by dependency name.
#[derive(Debug)]
pub struct CircuitBreakers {
    defaults: BreakerSettings,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakers {
    /// Create a registry. Unconfigured dependencies get `defaults`.
    pub fn new(defaults: BreakerSettings) -> Self {
        Self {
            defaults,
            breakers: DashMap::new(),
        }
    }

    /// Register a dependency with explicit settings, replacing any existing breaker.
    pub fn configure(&self, name: &str, settings: BreakerSettings) -> Arc<CircuitBreaker> {
        let breaker = Arc::new(CircuitBreaker::new(name, settings));
        self.breakers.insert(name.to_string(), breaker.clone());
        breaker
    }

    /// Breaker for `name`, created with the defaults on first use.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(name) {
            return breaker.value().clone();
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.defaults)))
            .value()
            .clone()
    }

    /// Run `thunk` under the breaker of `dependency`.
    pub async fn execute<T, F, Fut>(&self, dependency: &Dependency, thunk: F) -> Result<T, DependencyFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let breaker = self.get(&dependency.name);
        breaker.execute(thunk).await
    }

    /// Snapshots of every breaker, sorted by dependency name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.iter().map(|b| b.value().snapshot()).collect();
        snapshots.sort_by(|a, b| a.dependency.cmp(&b.dependency));
        snapshots
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
