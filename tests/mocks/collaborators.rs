//! Mock cost calculator and standard logging builder
//!
//! Record what the payload builder hands them so tests can check the order
//! and content of delegation.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use sentinel_passthrough::payload::{
    CostCalculator, CostError, LogStatus, LoggingPayload, StandardLoggingBuilder,
    StandardLoggingError,
};
use sentinel_passthrough::{AggregateResponse, RequestContext};

/// Cost calculator returning a fixed price and recording the models it saw
#[derive(Default)]
pub struct FixedCost {
    pub cost: f64,
    pub models: Mutex<Vec<String>>,
}

impl FixedCost {
    pub fn new(cost: f64) -> Self {
        Self {
            cost,
            models: Mutex::new(Vec::new()),
        }
    }
}

impl CostCalculator for FixedCost {
    fn compute_cost(&self, _response: &AggregateResponse, model: &str) -> Result<f64, CostError> {
        self.models.lock().unwrap().push(model.to_string());
        Ok(self.cost)
    }
}

/// Cost calculator that always fails
pub struct FailingCost;

impl CostCalculator for FailingCost {
    fn compute_cost(&self, _response: &AggregateResponse, model: &str) -> Result<f64, CostError> {
        Err(CostError::UnknownModel(model.to_string()))
    }
}

/// Snapshot of one standard logging call
#[derive(Debug, Clone)]
pub struct StandardCall {
    pub call_id: String,
    pub response_id: String,
    pub response_model: String,
    pub user_id: Option<String>,
    pub response_cost: Option<f64>,
    pub status: LogStatus,
}

/// Standard logging builder recording every call
#[derive(Default)]
pub struct RecordingStandardLogging {
    pub calls: Mutex<Vec<StandardCall>>,
}

impl RecordingStandardLogging {
    pub fn calls(&self) -> Vec<StandardCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl StandardLoggingBuilder for RecordingStandardLogging {
    fn build_standard_object(
        &self,
        context: &RequestContext,
        kwargs: &LoggingPayload,
        response: &AggregateResponse,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
        status: LogStatus,
    ) -> Result<Value, StandardLoggingError> {
        self.calls.lock().unwrap().push(StandardCall {
            call_id: context.call_id.clone(),
            response_id: response.id.clone(),
            response_model: response.model.clone(),
            user_id: kwargs.user_id.clone(),
            response_cost: kwargs.response_cost,
            status,
        });
        Ok(json!({"recorded": true, "id": response.id}))
    }
}

/// Standard logging builder that always fails
pub struct FailingStandardLogging;

impl StandardLoggingBuilder for FailingStandardLogging {
    fn build_standard_object(
        &self,
        _context: &RequestContext,
        _kwargs: &LoggingPayload,
        _response: &AggregateResponse,
        _start_time: DateTime<Utc>,
        _end_time: DateTime<Utc>,
        _status: LogStatus,
    ) -> Result<Value, StandardLoggingError> {
        Err(StandardLoggingError::Rejected("telemetry sink unavailable".to_string()))
    }
}
