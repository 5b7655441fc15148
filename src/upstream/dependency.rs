//! Dependency abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream dependency
//! - Render the outbound request for one inbound request
//! - Extract the published value from an upstream body
//!
//! Dependencies are built once at startup and shared read-only via `Arc`.

use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use crate::aggregation::RequestContext;
use crate::config::DependencyConfig;
use crate::upstream::error::CallError;

/// Error building a dependency from configuration.
#[derive(Debug, thiserror::Error)]
#[error("dependency '{name}': invalid base_url: {source}")]
pub struct DependencyError {
    pub name: String,
    #[source]
    pub source: url::ParseError,
}

/// A single upstream dependency.
#[derive(Debug, Clone)]
pub struct Dependency {
    /// Unique dependency name.
    pub name: String,
    /// Pre-parsed base URL.
    pub base_url: Url,
    /// Path template with `{param}` placeholders.
    pub path: String,
    /// Placeholder defaults.
    pub params: BTreeMap<String, String>,
    /// Fixed query string.
    pub query: Option<String>,
    /// Field read from the upstream body.
    pub extract_field: String,
    /// Key in the merged payload.
    pub output_field: String,
    /// Value used when the field is absent.
    pub fallback: String,
}

/// The minimal outbound request for one dependency call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub path: String,
    pub query: Option<String>,
}

impl Dependency {
    pub fn from_config(config: &DependencyConfig) -> Result<Self, DependencyError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| DependencyError {
            name: config.name.clone(),
            source,
        })?;

        Ok(Self {
            name: config.name.clone(),
            base_url,
            path: config.path.clone(),
            params: config.params.clone(),
            query: config.query.clone(),
            extract_field: config.extract_field.clone(),
            output_field: config.output_field.clone(),
            fallback: config.fallback.clone(),
        })
    }

    /// Render the outbound request. Inbound query parameters override the
    /// configured placeholder defaults.
    pub fn request_spec(&self, ctx: &RequestContext) -> RequestSpec {
        let mut path = String::with_capacity(self.path.len());
        let mut rest = self.path.as_str();

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            let name = &rest[open + 1..open + close];
            path.push_str(&rest[..open]);
            match ctx.params.get(name).or_else(|| self.params.get(name)) {
                Some(value) => path.push_str(&encode_segment(value)),
                None => path.push_str(&rest[open..=open + close]),
            }
            rest = &rest[open + close + 1..];
        }
        path.push_str(rest);

        RequestSpec {
            path,
            query: self.query.clone(),
        }
    }

    /// Full URL for a rendered request. The rendered path is appended to
    /// any path already on `base_url`.
    pub fn url_for(&self, spec: &RequestSpec) -> Url {
        let mut url = self.base_url.clone();
        let base = url.path().trim_end_matches('/');
        let path = match spec.path.strip_prefix('/') {
            Some(rest) => format!("{base}/{rest}"),
            None => format!("{base}/{}", spec.path),
        };
        url.set_path(&path);
        url.set_query(spec.query.as_deref());
        url
    }

    /// Read the configured string field, or the fallback when absent.
    ///
    /// Absence (or `null`) is not a failure. A body that is not a JSON object,
    /// or a field that is not a string, is a decode error.
    pub fn extract(&self, body: &Value) -> Result<String, CallError> {
        let Value::Object(fields) = body else {
            return Err(CallError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(body)
            )));
        };
        match fields.get(&self.extract_field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Ok(self.fallback.clone()),
            Some(other) => Err(CallError::Decode(format!(
                "field '{}' is {}, expected string",
                self.extract_field,
                json_kind(other)
            ))),
        }
    }
}

/// Placeholder names appearing in a path template, in order.
pub fn path_placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}') else {
            break;
        };
        names.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    names
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn encode_segment(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
