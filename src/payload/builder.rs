//! Logging payload construction
//!
//! Turns an assembled (or translated) response into the record handed to the
//! telemetry sink. Construction never fails: a cost that cannot be computed is
//! logged and left empty, and any other failure falls back to a payload that
//! carries only what the caller supplied.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::attribution::resolve_user_id;
use super::cost::{CostCalculator, CostError};
use super::standard::{LogStatus, StandardLoggingBuilder, StandardLoggingError};
use crate::config::{Config, DEFAULT_INTERNAL_METADATA_FIELD};
use crate::metrics;
use crate::native::response::AggregateResponse;
use crate::proxy::logging::RequestContext;

/// Payload fields a caller kwarg may not shadow
pub const RESERVED_FIELDS: &[&str] = &[
    "call_id",
    "start_time",
    "end_time",
    "response_cost",
    "model",
    "user_id",
    "proxy_server_request",
    "standard_logging_object",
];

/// Record handed to the telemetry sink for one call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingPayload {
    /// Call ID; also stamped onto the response
    pub call_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Cost in USD, `None` if it could not be computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// End user the request was made for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// `{"body": {"user": ...}}` when an end user was resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_server_request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_logging_object: Option<Value>,
    /// Caller-supplied passthrough fields, never named like a field above
    #[serde(flatten)]
    pub kwargs: Map<String, Value>,
}

impl LoggingPayload {
    /// Payload with timing and call ID only
    pub fn empty(call_id: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            call_id: call_id.into(),
            start_time,
            end_time,
            response_cost: None,
            model: None,
            user_id: None,
            proxy_server_request: None,
            standard_logging_object: None,
            kwargs: Map::new(),
        }
    }

    /// Payload carrying only the caller's kwargs, call ID and timing.
    ///
    /// Kwargs named like a payload field are dropped.
    pub fn from_kwargs(context: &RequestContext, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        let kwargs = context
            .kwargs
            .iter()
            .filter(|(key, _)| !is_reserved_field(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Self {
            kwargs,
            ..Self::empty(context.call_id.clone(), start_time, end_time)
        }
    }

    /// True if no derived field has been filled in
    pub fn is_bare(&self) -> bool {
        self.response_cost.is_none()
            && self.model.is_none()
            && self.user_id.is_none()
            && self.proxy_server_request.is_none()
            && self.standard_logging_object.is_none()
    }
}

/// Failures while building a payload
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Cost calculation failed: {0}")]
    Cost(#[from] CostError),

    #[error("Standard logging object failed: {0}")]
    StandardObject(#[from] StandardLoggingError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PayloadError {
    /// Stage label for metrics
    pub fn stage(&self) -> &'static str {
        match self {
            PayloadError::Cost(_) => "cost",
            PayloadError::StandardObject(_) => "standard_object",
            PayloadError::Serialization(_) => "serialization",
        }
    }
}

/// Derives cost, attribution and the standard logging object for a response
#[derive(Clone)]
pub struct LoggingPayloadBuilder {
    cost_calculator: Arc<dyn CostCalculator>,
    standard_logging: Arc<dyn StandardLoggingBuilder>,
    internal_metadata_field: String,
    log_standard_object: bool,
}

impl LoggingPayloadBuilder {
    pub fn new(
        cost_calculator: Arc<dyn CostCalculator>,
        standard_logging: Arc<dyn StandardLoggingBuilder>,
    ) -> Self {
        Self {
            cost_calculator,
            standard_logging,
            internal_metadata_field: DEFAULT_INTERNAL_METADATA_FIELD.to_string(),
            log_standard_object: false,
        }
    }

    /// Apply attribution and logging settings from configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.internal_metadata_field = config.internal_metadata_field.clone();
        self.log_standard_object = config.log_standard_object;
        self
    }

    /// Read the end user from `<field>.user` in the request body
    pub fn with_internal_metadata_field(mut self, field: impl Into<String>) -> Self {
        self.internal_metadata_field = field.into();
        self
    }

    /// Build the payload, stamping the call ID and model onto `response`.
    ///
    /// The model is the response's own model, or the request's when the
    /// response carries none. On failure the error is logged and a payload
    /// carrying only the caller's kwargs is returned; the response keeps any
    /// stamp already applied.
    pub fn build(
        &self,
        response: &mut AggregateResponse,
        context: &RequestContext,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> LoggingPayload {
        match self.try_build(response, context, start_time, end_time) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    call_id = %context.short_id(),
                    stage = e.stage(),
                    error = %e,
                    "Error creating passthrough logging payload"
                );
                metrics::record_payload_failure(e.stage());
                LoggingPayload::from_kwargs(context, start_time, end_time)
            }
        }
    }

    /// Build the payload, returning the first unrecoverable failure
    pub fn try_build(
        &self,
        response: &mut AggregateResponse,
        context: &RequestContext,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<LoggingPayload, PayloadError> {
        let model = if response.model.is_empty() {
            context.request_model().to_string()
        } else {
            response.model.clone()
        };

        let mut payload = LoggingPayload::from_kwargs(context, start_time, end_time);
        payload.response_cost = self.response_cost(response, &model);
        payload.model = Some(model.clone());

        if let Some(user) = resolve_user_id(&context.request_body, &self.internal_metadata_field) {
            payload.proxy_server_request = Some(json!({ "body": { "user": user } }));
            payload.user_id = Some(user);
        }

        response.id = context.call_id.clone();
        response.model = model;

        let standard_object = self.standard_logging.build_standard_object(
            context,
            &payload,
            response,
            start_time,
            end_time,
            LogStatus::Success,
        )?;

        let pretty = serde_json::to_string_pretty(&standard_object)?;
        if self.log_standard_object {
            info!(call_id = %context.short_id(), "standard_logging_object= {}", pretty);
        } else {
            debug!(call_id = %context.short_id(), "standard_logging_object= {}", pretty);
        }
        payload.standard_logging_object = Some(standard_object);

        context.log_payload_built(payload.response_cost, payload.user_id.as_deref());
        Ok(payload)
    }

    fn response_cost(&self, response: &AggregateResponse, model: &str) -> Option<f64> {
        match self.cost_calculator.compute_cost(response, model) {
            Ok(cost) => Some(cost),
            Err(e) => {
                let e = PayloadError::from(e);
                warn!(model = %model, error = %e, "Unable to compute response cost");
                metrics::record_cost_failure(model);
                None
            }
        }
    }
}

/// True if `key` names a [`LoggingPayload`] field
pub fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

impl std::fmt::Debug for LoggingPayloadBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingPayloadBuilder")
            .field("internal_metadata_field", &self.internal_metadata_field)
            .field("log_standard_object", &self.log_standard_object)
            .finish_non_exhaustive()
    }
}
