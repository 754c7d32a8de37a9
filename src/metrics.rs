//! Passthrough metrics
//!
//! Counters for stream reconstruction and payload construction. The library
//! installs no recorder; without one the macros are no-ops, so the embedding
//! proxy decides where metrics go.

/// Describe all passthrough metrics (call once at startup, after installing a recorder)
pub fn init_metrics() {
    register_metrics();
}

fn register_metrics() {
    metrics::describe_counter!(
        "sentinel_passthrough_frames_total",
        "Stream frames consumed, by outcome"
    );
    metrics::describe_counter!(
        "sentinel_passthrough_streams_total",
        "Streams finished, by terminal state"
    );
    metrics::describe_counter!(
        "sentinel_passthrough_cost_failures_total",
        "Responses whose cost could not be computed"
    );
    metrics::describe_counter!(
        "sentinel_passthrough_payload_failures_total",
        "Logging payloads that fell back to caller kwargs"
    );
    metrics::describe_counter!(
        "sentinel_passthrough_tokens_total",
        "Tokens seen in assembled responses"
    );
    metrics::describe_counter!(
        "sentinel_passthrough_estimations_total",
        "Responses whose completion tokens were estimated"
    );
}

/// Record one decoded frame
pub fn record_frame(outcome: &'static str) {
    metrics::counter!("sentinel_passthrough_frames_total", "outcome" => outcome).increment(1);
}

/// Record a stream reaching a terminal state
pub fn record_stream(status: &'static str) {
    metrics::counter!("sentinel_passthrough_streams_total", "status" => status).increment(1);
}

/// Record a cost computation failure
pub fn record_cost_failure(model: &str) {
    metrics::counter!(
        "sentinel_passthrough_cost_failures_total",
        "model" => model.to_string()
    )
    .increment(1);
}

/// Record a payload build that fell back to the original kwargs
pub fn record_payload_failure(stage: &'static str) {
    metrics::counter!("sentinel_passthrough_payload_failures_total", "stage" => stage).increment(1);
}

/// Record tokens processed
pub fn record_tokens(token_type: &'static str, count: u64, model: &str) {
    metrics::counter!(
        "sentinel_passthrough_tokens_total",
        "type" => token_type,
        "model" => model.to_string()
    )
    .increment(count);
}

/// Record a fallback token estimation
pub fn record_fallback_estimation(model: &str) {
    metrics::counter!(
        "sentinel_passthrough_estimations_total",
        "model" => model.to_string()
    )
    .increment(1);
}
