//! Request logging utilities for passthrough traffic
//!
//! Provides structured logging with correlation IDs for tracing a passthrough
//! request from the first upstream frame to the finished logging payload.

use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, error, info, warn, Span};
use uuid::Uuid;

use crate::payload::is_reserved_field;

/// Context for one passthrough request
///
/// Carries the call ID that ends up on the logging payload, the parsed client
/// request body used for attribution, and any kwargs the caller wants passed
/// through to the telemetry sink untouched.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this call
    pub call_id: String,
    /// When the request started
    pub start_time: Instant,
    /// Upstream provider handling this request
    pub provider: String,
    /// API endpoint being called
    pub endpoint: String,
    /// Model named by the request, if known
    pub model: Option<String>,
    /// Whether this is a streaming request
    pub streaming: bool,
    /// Parsed client request body (`Value::Null` if none)
    pub request_body: Value,
    /// Caller-supplied fields copied onto the logging payload
    pub kwargs: Map<String, Value>,
}

impl RequestContext {
    /// Create a new request context
    pub fn new(provider: &str, endpoint: &str) -> Self {
        Self {
            call_id: Uuid::new_v4().to_string(),
            start_time: Instant::now(),
            provider: provider.to_string(),
            endpoint: endpoint.to_string(),
            model: None,
            streaming: false,
            request_body: Value::Null,
            kwargs: Map::new(),
        }
    }

    /// Use a specific call ID instead of a generated one
    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    /// Set the model for this request
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Mark this as a streaming request
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Attach the client request body.
    ///
    /// The body's `model` and `stream` fields fill in the model and streaming
    /// flag when they have not been set explicitly.
    pub fn with_request_body(mut self, body: Value) -> Self {
        if self.model.is_none() {
            self.model = body
                .get("model")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
        }
        if let Some(stream) = body.get("stream").and_then(Value::as_bool) {
            self.streaming = stream;
        }
        self.request_body = body;
        self
    }

    /// Add one passthrough kwarg.
    ///
    /// Keys naming a logging payload field are dropped with a warning.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if is_reserved_field(&key) {
            warn!(call_id = %self.short_id(), key = %key, "Ignoring kwarg that shadows a payload field");
            return self;
        }
        self.kwargs.insert(key, value);
        self
    }

    /// Model named in the request body, or empty
    pub fn request_model(&self) -> &str {
        self.request_body
            .get("model")
            .and_then(Value::as_str)
            .or(self.model.as_deref())
            .unwrap_or_default()
    }

    /// Short form of the call ID for log readability
    pub fn short_id(&self) -> &str {
        self.call_id.get(..8).unwrap_or(&self.call_id)
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.start_time.elapsed().as_millis()
    }

    /// Log stream started (first upstream bytes seen)
    pub fn log_stream_started(&self) {
        info!(
            call_id = %self.short_id(),
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            elapsed_ms = %self.elapsed_ms(),
            "Passthrough stream started"
        );
    }

    /// Log stream ended
    pub fn log_stream_ended(&self, chunks: Option<usize>) {
        info!(
            call_id = %self.short_id(),
            provider = %self.provider,
            endpoint = %self.endpoint,
            chunks = ?chunks,
            elapsed_ms = %self.elapsed_ms(),
            "Passthrough stream ended"
        );
    }

    /// Log stream aborted before it could be assembled
    pub fn log_stream_aborted(&self, error: &str) {
        warn!(
            call_id = %self.short_id(),
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Passthrough stream aborted, not logging"
        );
    }

    /// Log logging payload construction
    pub fn log_payload_built(&self, response_cost: Option<f64>, user_id: Option<&str>) {
        debug!(
            call_id = %self.short_id(),
            provider = %self.provider,
            model = ?self.model,
            response_cost = ?response_cost,
            user_id = ?user_id,
            streaming = %self.streaming,
            "Logging payload built"
        );
    }

    /// Log a warning condition
    pub fn log_warning(&self, message: &str) {
        warn!(
            call_id = %self.short_id(),
            provider = %self.provider,
            endpoint = %self.endpoint,
            elapsed_ms = %self.elapsed_ms(),
            message = %message,
            "Warning during passthrough logging"
        );
    }

    /// Log request failure
    pub fn log_error(&self, error: &str) {
        error!(
            call_id = %self.short_id(),
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            streaming = %self.streaming,
            elapsed_ms = %self.elapsed_ms(),
            error = %error,
            "Passthrough logging failed"
        );
    }

    /// Create a tracing span for this request
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "passthrough_request",
            call_id = %self.short_id(),
            provider = %self.provider,
            endpoint = %self.endpoint,
            model = ?self.model,
            streaming = %self.streaming,
        )
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("anthropic", "/v1/messages")
    }
}
