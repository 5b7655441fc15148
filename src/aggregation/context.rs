//! Per-request context handed to the aggregator.

use std::collections::BTreeMap;

/// Request-scoped inputs for one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlation ID (from `x-request-id`).
    pub request_id: String,
    /// Inbound query parameters, used to fill dependency path templates.
    pub params: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.params.extend(params);
        self
    }
}
