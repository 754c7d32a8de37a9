//! Canonical streaming chunk types
//!
//! Provider-agnostic delta units. The normalizer produces them from provider
//! events and the assembler folds them into a single response.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Reason the generation stopped, in the OpenAI-compatible vocabulary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of turn or a stop sequence
    Stop,
    /// Token limit reached
    Length,
    /// The model asked for one or more tool invocations
    ToolCalls,
    /// Output withheld by the provider
    ContentFilter,
}

impl FinishReason {
    /// Wire representation of the finish reason
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token usage reported partway through a stream.
///
/// Providers report cumulative counters, so merging keeps the largest value
/// seen for each field. Counters never go down.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsagePartial {
    /// Uncached prompt tokens
    #[serde(default)]
    pub input_tokens: u64,
    /// Generated tokens
    #[serde(default)]
    pub output_tokens: u64,
    /// Prompt tokens written to the provider's prompt cache
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    /// Prompt tokens served from the provider's prompt cache
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

impl UsagePartial {
    /// Create a partial usage record with only input/output counts
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            ..Self::default()
        }
    }

    /// Merge another report into this one, keeping the maximum of each counter
    pub fn merge(&mut self, other: &UsagePartial) {
        self.input_tokens = self.input_tokens.max(other.input_tokens);
        self.output_tokens = self.output_tokens.max(other.output_tokens);
        self.cache_creation_input_tokens = self
            .cache_creation_input_tokens
            .max(other.cache_creation_input_tokens);
        self.cache_read_input_tokens = self
            .cache_read_input_tokens
            .max(other.cache_read_input_tokens);
    }

    /// All prompt-side tokens, cached or not
    pub fn prompt_tokens(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.cache_creation_input_tokens)
            .saturating_add(self.cache_read_input_tokens)
    }

    /// True when nothing has been counted yet
    pub fn is_empty(&self) -> bool {
        self.input_tokens == 0
            && self.cache_creation_input_tokens == 0
            && self.cache_read_input_tokens == 0
            && self.output_tokens == 0
    }
}

/// A fragment of a tool call.
///
/// `index` identifies which call in the response the fragment belongs to.
/// The first fragment for an index usually carries `id` and `name`; later
/// ones carry only an `arguments` slice that must be appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl ToolCallFragment {
    /// Fragment carrying only an argument slice
    pub fn arguments(index: u32, arguments: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            name: None,
            arguments: Some(arguments.into()),
        }
    }
}

/// Provider-agnostic streaming delta.
///
/// At most one of `delta_text`, `delta_reasoning`, `delta_tool_call` and
/// `finish_reason` is set. `usage_partial` may accompany a finish reason or
/// stand alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_tool_call: Option<ToolCallFragment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_partial: Option<UsagePartial>,
}

impl CanonicalChunk {
    /// Text delta
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            delta_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Extended-thinking delta
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            delta_reasoning: Some(text.into()),
            ..Self::default()
        }
    }

    /// Tool call fragment
    pub fn tool_call(fragment: ToolCallFragment) -> Self {
        Self {
            delta_tool_call: Some(fragment),
            ..Self::default()
        }
    }

    /// End-of-generation marker, optionally carrying the usage tally
    pub fn finish(reason: FinishReason, usage: Option<UsagePartial>) -> Self {
        Self {
            finish_reason: Some(reason),
            usage_partial: usage,
            ..Self::default()
        }
    }

    /// Usage-only chunk
    pub fn usage(usage: UsagePartial) -> Self {
        Self {
            usage_partial: Some(usage),
            ..Self::default()
        }
    }

    /// True if the chunk carries content or a finish reason (not just usage)
    pub fn is_semantic(&self) -> bool {
        self.delta_text.is_some()
            || self.delta_reasoning.is_some()
            || self.delta_tool_call.is_some()
            || self.finish_reason.is_some()
    }
}
