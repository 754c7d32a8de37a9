//! Common test utilities
//!
//! Captured Anthropic traffic and helpers for building handlers and request
//! contexts.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use sentinel_passthrough::{Config, PassthroughLoggingHandler, RequestContext};

/// Test constants
pub mod constants {
    pub const TEST_CALL_ID: &str = "call-7f3c2a10-0000-4000-8000-000000000001";
    pub const TEST_MODEL: &str = "claude-3-5-sonnet-20241022";
    pub const TEST_INTERNAL_USER: &str = "internal-user-42";
    pub const TEST_ANTHROPIC_USER: &str = "anthropic-user-7";
}

/// Fixed start time for deterministic payloads
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Fixed end time, two seconds after [`start_time`]
pub fn end_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 2).unwrap()
}

/// Handler with default collaborators and no usage estimation
pub fn handler() -> PassthroughLoggingHandler {
    PassthroughLoggingHandler::with_defaults(&Config {
        estimate_missing_usage: false,
        ..Config::default()
    })
}

/// Streaming request body for [`constants::TEST_MODEL`]
pub fn request_body() -> Value {
    json!({
        "model": constants::TEST_MODEL,
        "max_tokens": 1024,
        "stream": true,
        "messages": [{"role": "user", "content": "Hello"}]
    })
}

/// Context for a streaming request with a fixed call ID
pub fn context(body: Value) -> RequestContext {
    RequestContext::new("anthropic", "/v1/messages")
        .with_call_id(constants::TEST_CALL_ID)
        .with_request_body(body)
}

/// A text-only stream: "Hello, world" in three deltas
pub fn text_transcript() -> Vec<String> {
    vec![
        "event: message_start".to_string(),
        format!(
            r#"data: {{"type":"message_start","message":{{"id":"msg_01TEXT","type":"message","role":"assistant","model":"{}","content":[],"stop_reason":null,"usage":{{"input_tokens":25,"cache_read_input_tokens":10,"output_tokens":1}}}}}}"#,
            constants::TEST_MODEL
        ),
        "event: content_block_start".to_string(),
        r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#.to_string(),
        "event: ping".to_string(),
        r#"data: {"type":"ping"}"#.to_string(),
        "event: content_block_delta".to_string(),
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#.to_string(),
        "event: content_block_delta".to_string(),
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"lo, "}}"#.to_string(),
        "event: content_block_delta".to_string(),
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"world"}}"#.to_string(),
        "event: content_block_stop".to_string(),
        r#"data: {"type":"content_block_stop","index":0}"#.to_string(),
        "event: message_delta".to_string(),
        r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn","stop_sequence":null},"usage":{"output_tokens":12}}"#.to_string(),
        "event: message_stop".to_string(),
        r#"data: {"type":"message_stop"}"#.to_string(),
    ]
}

/// A stream with text followed by a tool call split over two deltas
pub fn tool_transcript() -> Vec<String> {
    vec![
        r#"data: {"type":"message_start","message":{"id":"msg_01TOOL","type":"message","role":"assistant","model":"claude-3-5-sonnet-20241022","content":[],"usage":{"input_tokens":300,"output_tokens":1}}}"#.to_string(),
        r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#.to_string(),
        r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Checking."}}"#.to_string(),
        r#"data: {"type":"content_block_stop","index":0}"#.to_string(),
        r#"data: {"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_01","name":"get_weather","input":{}}}"#.to_string(),
        r#"data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"location\":"}}"#.to_string(),
        r#"data: {"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":" \"Paris\"}"}}"#.to_string(),
        r#"data: {"type":"content_block_stop","index":1}"#.to_string(),
        r#"data: {"type":"message_delta","delta":{"stop_reason":"tool_use","stop_sequence":null},"usage":{"output_tokens":48}}"#.to_string(),
        r#"data: {"type":"message_stop"}"#.to_string(),
    ]
}

/// Join frames into an SSE transcript as it appears on the wire
pub fn to_wire(frames: &[String]) -> String {
    frames.iter().map(|f| format!("{}\n\n", f)).collect()
}

/// A non-streamed Messages API response body
pub fn message_body() -> Value {
    json!({
        "id": "msg_01BODY",
        "type": "message",
        "role": "assistant",
        "model": constants::TEST_MODEL,
        "content": [
            {"type": "text", "text": "Let me look that up."},
            {"type": "tool_use", "id": "toolu_02", "name": "search", "input": {"query": "rust"}}
        ],
        "stop_reason": "tool_use",
        "stop_sequence": null,
        "usage": {"input_tokens": 120, "output_tokens": 40}
    })
}
