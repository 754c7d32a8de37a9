//! Standard logging object
//!
//! The provider-agnostic record downstream telemetry sinks consume. The
//! builder delegates its construction to a [`StandardLoggingBuilder`] so the
//! embedding proxy can supply its own schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::builder::LoggingPayload;
use crate::native::response::AggregateResponse;
use crate::proxy::logging::RequestContext;

/// Call type recorded for passthrough traffic
pub const PASS_THROUGH_CALL_TYPE: &str = "pass_through_endpoint";

/// Outcome recorded on the standard logging object
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Failure,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Failure => "failure",
        }
    }
}

/// Errors from building the standard logging object
#[derive(Debug, Error)]
pub enum StandardLoggingError {
    #[error("End time {end} is before start time {start}")]
    InvalidTiming {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Standard logging object rejected: {0}")]
    Rejected(String),

    #[error("Failed to serialize standard logging object: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Builds the standard logging object for a finished call
pub trait StandardLoggingBuilder: Send + Sync {
    /// Build the object for the request in `context`.
    ///
    /// `kwargs` is the payload built so far (cost, model and end user filled
    /// in); `response` already carries the stamped call ID and model.
    fn build_standard_object(
        &self,
        context: &RequestContext,
        kwargs: &LoggingPayload,
        response: &AggregateResponse,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: LogStatus,
    ) -> Result<Value, StandardLoggingError>;
}

/// Built-in standard logging object
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStandardLogging;

impl DefaultStandardLogging {
    pub fn new() -> Self {
        Self
    }
}

impl StandardLoggingBuilder for DefaultStandardLogging {
    fn build_standard_object(
        &self,
        context: &RequestContext,
        kwargs: &LoggingPayload,
        response: &AggregateResponse,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        status: LogStatus,
    ) -> Result<Value, StandardLoggingError> {
        if end_time < start_time {
            return Err(StandardLoggingError::InvalidTiming {
                start: start_time,
                end: end_time,
            });
        }
        let response_time = (end_time - start_time).num_milliseconds() as f64 / 1000.0;

        Ok(json!({
            "id": context.call_id,
            "call_type": PASS_THROUGH_CALL_TYPE,
            "provider": context.provider,
            "endpoint": context.endpoint,
            "stream": context.streaming,
            "status": status.as_str(),
            "model": response.model,
            "response_cost": kwargs.response_cost,
            "end_user": kwargs.user_id,
            "start_time": start_time.to_rfc3339(),
            "end_time": end_time.to_rfc3339(),
            "response_time": response_time,
            "prompt_tokens": response.usage.prompt_tokens,
            "completion_tokens": response.usage.completion_tokens,
            "total_tokens": response.usage.total_tokens,
            "finish_reason": response.finish_reason(),
            "response": serde_json::to_value(response)?,
            "metadata": kwargs.kwargs,
        }))
    }
}
