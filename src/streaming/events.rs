//! Anthropic Messages API wire events
//!
//! Deserialization targets for the `data:` payloads of an Anthropic SSE
//! stream. Field names follow the provider's wire format.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::native::chunk::UsagePartial;

/// Usage block as Anthropic reports it.
///
/// Every counter is optional (and cache counters may be `null`); missing
/// values mean "not reported" and merge as zero.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnthropicUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_creation_input_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
}

impl From<&AnthropicUsage> for UsagePartial {
    fn from(usage: &AnthropicUsage) -> Self {
        Self {
            input_tokens: usage.input_tokens.unwrap_or(0),
            output_tokens: usage.output_tokens.unwrap_or(0),
            cache_creation_input_tokens: usage.cache_creation_input_tokens.unwrap_or(0),
            cache_read_input_tokens: usage.cache_read_input_tokens.unwrap_or(0),
        }
    }
}

/// The `message` object carried by `message_start`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MessageStart {
    pub id: Option<String>,
    pub model: Option<String>,
    pub usage: Option<AnthropicUsage>,
}

/// Content block opened by `content_block_start`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

/// Delta carried by `content_block_delta`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    #[serde(other)]
    Other,
}

/// The `delta` object carried by `message_delta`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct MessageDelta {
    pub stop_reason: Option<String>,
    pub stop_sequence: Option<String>,
}

/// Error payload of an in-stream `error` event
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    /// Any other fields the provider attached
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UpstreamErrorBody {
    /// The error object as the provider sent it
    pub fn payload(&self) -> Value {
        let mut object = self.extra.clone();
        object.insert("type".to_string(), Value::String(self.error_type.clone()));
        object.insert("message".to_string(), Value::String(self.message.clone()));
        Value::Object(object)
    }
}

/// One decoded provider event.
///
/// Unknown event types decode to [`GenericEvent::Unknown`] so that new
/// provider events do not abort otherwise healthy streams.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenericEvent {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: u32,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        #[serde(default)]
        delta: MessageDelta,
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: UpstreamErrorBody,
    },
    #[serde(other)]
    Unknown,
}

impl GenericEvent {
    /// Wire name of the event, for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            GenericEvent::MessageStart { .. } => "message_start",
            GenericEvent::ContentBlockStart { .. } => "content_block_start",
            GenericEvent::ContentBlockDelta { .. } => "content_block_delta",
            GenericEvent::ContentBlockStop { .. } => "content_block_stop",
            GenericEvent::MessageDelta { .. } => "message_delta",
            GenericEvent::MessageStop => "message_stop",
            GenericEvent::Ping => "ping",
            GenericEvent::Error { .. } => "error",
            GenericEvent::Unknown => "unknown",
        }
    }
}
