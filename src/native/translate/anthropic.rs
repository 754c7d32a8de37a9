//! Anthropic translator implementation
//!
//! Converts Anthropic Messages API response bodies into the canonical format.
//! The stop-reason mapping is shared with the streaming normalizer.

use serde::Deserialize;
use serde_json::Value;

use super::{ResponseTranslator, TranslationError};
use crate::native::chunk::{FinishReason, UsagePartial};
use crate::native::response::{
    AggregateResponse, Choice, ChoiceMessage, Role, ToolCall, ToolCallFunction, Usage,
};
use crate::streaming::events::AnthropicUsage;

/// Map an Anthropic stop reason to the canonical finish reason.
///
/// Anthropic uses: end_turn, max_tokens, stop_sequence, tool_use, pause_turn, refusal.
/// Unknown reasons map to `stop`.
pub fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" | "pause_turn" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    Thinking {
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    role: Role,
    #[serde(default)]
    content: Vec<ResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: AnthropicUsage,
}

/// Anthropic Messages API translator
#[derive(Debug, Clone, Default)]
pub struct AnthropicTranslator;

impl AnthropicTranslator {
    /// Create a new Anthropic translator
    pub fn new() -> Self {
        Self
    }

    fn check_error_envelope(response: &Value) -> Result<(), TranslationError> {
        if response.get("type").and_then(Value::as_str) != Some("error") {
            return Ok(());
        }
        let error = response.get("error");
        let field = |name: &str| {
            error
                .and_then(|e| e.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Err(TranslationError::ProviderError {
            error_type: field("type"),
            message: field("message"),
        })
    }
}

impl ResponseTranslator for AnthropicTranslator {
    fn translate_response(
        &self,
        response: &Value,
        created: i64,
    ) -> Result<AggregateResponse, TranslationError> {
        Self::check_error_envelope(response)?;
        if !response.is_object() {
            return Err(TranslationError::InvalidResponseFormat(
                "expected a JSON object".to_string(),
            ));
        }

        let body = MessageBody::deserialize(response)?;

        let mut text = String::new();
        let mut reasoning = String::new();
        let mut tool_calls = Vec::new();
        for block in body.content {
            match block {
                ResponseBlock::Text { text: part } => text.push_str(&part),
                ResponseBlock::Thinking { thinking } => reasoning.push_str(&thinking),
                ResponseBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    call_type: "function".to_string(),
                    function: ToolCallFunction {
                        name,
                        arguments: serde_json::to_string(&input)?,
                    },
                }),
                ResponseBlock::Other => {}
            }
        }

        let message = ChoiceMessage {
            role: body.role,
            content: (!text.is_empty()).then_some(text),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
        };

        Ok(AggregateResponse {
            id: body.id,
            object: AggregateResponse::OBJECT.to_string(),
            created,
            model: body.model,
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: body
                    .stop_reason
                    .as_deref()
                    .map(|reason| self.translate_stop_reason(reason)),
            }],
            usage: Usage::from_partial(&UsagePartial::from(&body.usage)),
        })
    }

    fn translate_stop_reason(&self, reason: &str) -> FinishReason {
        map_stop_reason(reason)
    }
}
