//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check dependency definitions are unique and renderable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{BreakerConfig, GatewayConfig};
use crate::upstream::dependency::path_placeholders;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: String },

    #[error("{field} must be at least 1")]
    ZeroThreshold { field: String },

    #[error("dependency name must not be empty")]
    EmptyName,

    #[error("duplicate dependency name '{0}'")]
    DuplicateName(String),

    #[error("duplicate output field '{0}'")]
    DuplicateOutputField(String),

    #[error("dependency '{name}' has invalid base_url '{url}'")]
    BaseUrl { name: String, url: String },

    #[error("dependency '{name}' path placeholder '{{{param}}}' has no default")]
    UnboundPlaceholder { name: String, param: String },

    #[error("timeouts.request_secs ({request_ms}ms) must exceed {field} ({call_ms}ms)")]
    RequestTimeoutTooShort { field: String, request_ms: u64, call_ms: u64 },
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let timeouts = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("upstream.connect_timeout_ms", config.upstream.connect_timeout_ms),
        ("upstream.idle_timeout_ms", config.upstream.idle_timeout_ms),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout { field: field.to_string() });
        }
    }

    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    check_breaker("breaker", &config.breaker, request_ms, &mut errors);

    let mut names = HashSet::new();
    let mut outputs = HashSet::new();
    for dep in &config.dependencies {
        if dep.name.trim().is_empty() {
            errors.push(ValidationError::EmptyName);
        } else if !names.insert(dep.name.as_str()) {
            errors.push(ValidationError::DuplicateName(dep.name.clone()));
        }

        if !outputs.insert(dep.output_field.as_str()) {
            errors.push(ValidationError::DuplicateOutputField(dep.output_field.clone()));
        }

        let scheme_ok = Url::parse(&dep.base_url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
            .unwrap_or(false);
        if !scheme_ok {
            errors.push(ValidationError::BaseUrl {
                name: dep.name.clone(),
                url: dep.base_url.clone(),
            });
        }

        for param in path_placeholders(&dep.path) {
            if !dep.params.contains_key(param) {
                errors.push(ValidationError::UnboundPlaceholder {
                    name: dep.name.clone(),
                    param: param.to_string(),
                });
            }
        }

        if let Some(breaker) = &dep.breaker {
            check_breaker(
                &format!("dependencies.{}.breaker", dep.name),
                breaker,
                request_ms,
                &mut errors,
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Per-breaker checks. The inbound request bound must outlast the call
/// deadline so a slow dependency surfaces as a failure, not a 408.
fn check_breaker(prefix: &str, breaker: &BreakerConfig, request_ms: u64, errors: &mut Vec<ValidationError>) {
    if breaker.max_failures == 0 {
        errors.push(ValidationError::ZeroThreshold {
            field: format!("{prefix}.max_failures"),
        });
    }
    if breaker.call_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: format!("{prefix}.call_timeout_ms"),
        });
    }
    if breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: format!("{prefix}.reset_timeout_ms"),
        });
    }
    if request_ms > 0 && breaker.call_timeout_ms >= request_ms {
        errors.push(ValidationError::RequestTimeoutTooShort {
            field: format!("{prefix}.call_timeout_ms"),
            request_ms,
            call_ms: breaker.call_timeout_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn zero_breaker_timeout_is_rejected() {
        let mut config = GatewayConfig::default();
        config.breaker.call_timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ZeroTimeout {
                field: "breaker.call_timeout_ms".into()
            }]
        );
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.dependencies[1].name = config.dependencies[0].name.clone();
        config.dependencies[1].base_url = "ftp://example.com".into();
        config.dependencies[1].params.clear();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::BindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::DuplicateName("post".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::BaseUrl { url, .. } if url == "ftp://example.com")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnboundPlaceholder { param, .. } if param == "id")));
    }

    #[test]
    fn request_timeout_must_outlast_call_timeouts() {
        let mut config = GatewayConfig::default();
        config.timeouts.request_secs = 2;
        config.breaker.call_timeout_ms = 1_500;
        config.dependencies[1].breaker = Some(BreakerConfig {
            max_failures: 3,
            call_timeout_ms: 2_000,
            reset_timeout_ms: 10_000,
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::RequestTimeoutTooShort {
                field: "dependencies.author.breaker.call_timeout_ms".into(),
                request_ms: 2_000,
                call_ms: 2_000,
            }]
        );
    }

    #[test]
    fn empty_dependency_list_is_valid() {
        let mut config = GatewayConfig::default();
        config.dependencies.clear();
        assert!(validate_config(&config).is_ok());
    }
}
