//! Aggregate response types
//!
//! The canonical, OpenAI-shaped completion that both streamed and non-streamed
//! passthrough traffic is reduced to before logging.

use serde::{Deserialize, Serialize};

use super::chunk::{FinishReason, UsagePartial};

/// Role of a message author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the human
    User,
    /// Message from the model
    Assistant,
}

/// Token usage statistics
///
/// `total_tokens` is always `prompt_tokens + completion_tokens`; construct
/// through [`Usage::new`] or [`Usage::from_partial`] to keep that true.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Number of tokens in the prompt, including cached prompt tokens
    pub prompt_tokens: u64,
    /// Number of tokens in the completion
    pub completion_tokens: u64,
    /// Total tokens used
    pub total_tokens: u64,
    /// Prompt tokens written to the prompt cache
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cache_creation_input_tokens: u64,
    /// Prompt tokens read from the prompt cache
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cache_read_input_tokens: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl Usage {
    /// Create usage with no cache accounting
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 0,
        }
    }

    /// Convert a provider tally into canonical usage
    pub fn from_partial(partial: &UsagePartial) -> Self {
        let prompt_tokens = partial.prompt_tokens();
        Self {
            prompt_tokens,
            completion_tokens: partial.output_tokens,
            total_tokens: prompt_tokens.saturating_add(partial.output_tokens),
            cache_creation_input_tokens: partial.cache_creation_input_tokens,
            cache_read_input_tokens: partial.cache_read_input_tokens,
        }
    }

    /// Replace the completion count, keeping the total consistent
    pub fn with_completion_tokens(mut self, completion_tokens: u64) -> Self {
        self.completion_tokens = completion_tokens;
        self.total_tokens = self.prompt_tokens.saturating_add(completion_tokens);
        self
    }

    /// Prompt tokens that were neither written to nor read from the cache
    pub fn uncached_prompt_tokens(&self) -> u64 {
        self.prompt_tokens
            .saturating_sub(self.cache_creation_input_tokens)
            .saturating_sub(self.cache_read_input_tokens)
    }
}

/// Function invocation inside a tool call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallFunction {
    /// Name of the function
    pub name: String,
    /// JSON-encoded arguments, exactly as produced by the model
    pub arguments: String,
}

/// A tool call made by the assistant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    /// Provider-assigned tool call ID (empty if upstream never sent one)
    pub id: String,
    /// Type of tool call (always "function")
    #[serde(rename = "type")]
    pub call_type: String,
    /// Function details
    pub function: ToolCallFunction,
}

/// Message in a completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceMessage {
    /// Role of the message author
    pub role: Role,
    /// Concatenated text content
    pub content: Option<String>,
    /// Tool calls made by the assistant, ordered by index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Extended-thinking text, when the model produced any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

/// A completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    /// Index of this choice
    pub index: u32,
    /// The generated message
    pub message: ChoiceMessage,
    /// Reason the generation stopped
    pub finish_reason: Option<FinishReason>,
}

/// A complete response reconstructed from upstream traffic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateResponse {
    /// Identifier; replaced by the call ID once the logging payload is built
    pub id: String,
    /// Object type (always "chat.completion")
    pub object: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Model used for completion
    pub model: String,
    /// Completion choices
    pub choices: Vec<Choice>,
    /// Token usage statistics
    pub usage: Usage,
}

impl AggregateResponse {
    /// Object type for chat completions
    pub const OBJECT: &'static str = "chat.completion";

    /// The first choice, which is the only one passthrough traffic produces
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }

    /// Text content of the first choice
    pub fn content(&self) -> Option<&str> {
        self.first_choice()
            .and_then(|choice| choice.message.content.as_deref())
    }

    /// Tool calls of the first choice
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.first_choice()
            .and_then(|choice| choice.message.tool_calls.as_deref())
            .unwrap_or(&[])
    }

    /// Finish reason of the first choice
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.first_choice().and_then(|choice| choice.finish_reason)
    }
}
