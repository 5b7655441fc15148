//! Fan-out / fan-in over breaker-guarded dependency calls.
//!
//! # Responsibilities
//! - Spawn one task per dependency for each inbound request
//! - Join every task, even after a sibling has failed
//! - Merge outcomes keyed by dependency, never by arrival order

use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;

use crate::aggregation::context::RequestContext;
use crate::aggregation::result::{AggregateFailure, AggregatePayload, AggregateResult};
use crate::config::GatewayConfig;
use crate::resilience::{BreakerSettings, CircuitBreaker, CircuitBreakers, DependencyFailure};
use crate::upstream::{CallError, Dependency, DependencyError, UpstreamClient};

/// A dependency paired with its breaker.
#[derive(Debug, Clone)]
struct Target {
    dependency: Arc<Dependency>,
    breaker: Arc<CircuitBreaker>,
}

/// Executes the configured dependency calls for one request and merges them.
pub struct Aggregator {
    targets: Vec<Target>,
    breakers: Arc<CircuitBreakers>,
    client: Arc<dyn UpstreamClient>,
}

impl Aggregator {
    /// Build from configuration, registering one breaker per dependency.
    pub fn from_config(config: &GatewayConfig, client: Arc<dyn UpstreamClient>) -> Result<Self, DependencyError> {
        let breakers = Arc::new(CircuitBreakers::new(BreakerSettings::from(&config.breaker)));
        let mut dependencies = Vec::with_capacity(config.dependencies.len());
        for dep in &config.dependencies {
            breakers.configure(&dep.name, BreakerSettings::from(&config.breaker_for(dep)));
            dependencies.push(Dependency::from_config(dep)?);
        }
        Ok(Self::new(dependencies, breakers, client))
    }

    /// Build from already-constructed parts. Dependencies without a
    /// registered breaker get the registry defaults.
    pub fn new(dependencies: Vec<Dependency>, breakers: Arc<CircuitBreakers>, client: Arc<dyn UpstreamClient>) -> Self {
        let targets = dependencies
            .into_iter()
            .map(|dependency| Target {
                breaker: breakers.get(&dependency.name),
                dependency: Arc::new(dependency),
            })
            .collect();

        Self {
            targets,
            breakers,
            client,
        }
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakers> {
        &self.breakers
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.targets.iter().map(|t| t.dependency.as_ref())
    }

    /// Call every dependency concurrently and merge the outcomes.
    pub async fn aggregate(&self, ctx: &RequestContext) -> AggregateResult {
        if self.targets.is_empty() {
            return AggregateResult::Success(AggregatePayload::new());
        }

        tracing::debug!(
            request_id = %ctx.request_id,
            dependencies = self.targets.len(),
            "Dispatching dependency calls"
        );

        let tasks = self.targets.iter().map(|target| {
            let dependency = target.dependency.clone();
            let breaker = target.breaker.clone();
            let client = self.client.clone();
            let spec = dependency.request_spec(ctx);

            // Spawned so a dropped inbound request does not cancel calls in flight.
            tokio::spawn(async move {
                breaker
                    .execute(|| async move {
                        let body = client.call(&dependency, &spec).await?;
                        dependency.extract(&body)
                    })
                    .await
            })
        });
        let outcomes = join_all(tasks).await;

        let mut payload = AggregatePayload::new();
        let mut succeeded = Vec::new();
        let mut failures = Vec::new();

        for (target, outcome) in self.targets.iter().zip(outcomes) {
            let dependency = &target.dependency;
            match outcome {
                Ok(Ok(value)) => {
                    payload.insert(dependency.output_field.clone(), Value::String(value));
                    succeeded.push(dependency.name.clone());
                }
                Ok(Err(failure)) => failures.push(failure),
                Err(e) => {
                    tracing::error!(dependency = %dependency.name, error = %e, "Dependency task aborted");
                    failures.push(DependencyFailure {
                        dependency: dependency.name.clone(),
                        mode: target.breaker.mode(),
                        error: CallError::Transport(format!("dependency task failed: {e}")),
                    });
                }
            }
        }

        if failures.is_empty() {
            tracing::debug!(request_id = %ctx.request_id, "All dependencies succeeded");
            return AggregateResult::Success(payload);
        }

        failures.sort_by(|a, b| a.dependency.cmp(&b.dependency));
        succeeded.sort();
        let failure = AggregateFailure { failures, succeeded };
        tracing::warn!(
            request_id = %ctx.request_id,
            failed = failure.failures.len(),
            succeeded = failure.succeeded.len(),
            causes = %failure.message(),
            "Aggregation failed"
        );
        AggregateResult::Failure(failure)
    }
}
