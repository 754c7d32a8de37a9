//! Response assembly
//!
//! Folds an ordered sequence of canonical chunks into one aggregate response.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::native::chunk::{CanonicalChunk, FinishReason, ToolCallFragment, UsagePartial};
use crate::native::response::{
    AggregateResponse, Choice, ChoiceMessage, Role, ToolCall, ToolCallFunction, Usage,
};
use crate::tokens::SharedTokenCounter;

/// Response-level metadata that does not travel in chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    /// Identifier for the response (upstream message ID, if known)
    pub id: String,
    /// Model used for completion
    pub model: String,
    /// Unix timestamp of creation
    pub created: i64,
}

impl StreamMetadata {
    /// Metadata carrying only a model name
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            model: model.into(),
            created: 0,
        }
    }
}

/// Tool call being accumulated across fragments
#[derive(Debug, Default)]
struct AccumulatedToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Accumulates tool call fragments, keyed and ordered by index
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    tool_calls: BTreeMap<u32, AccumulatedToolCall>,
}

impl ToolCallAccumulator {
    fn accumulate(&mut self, fragment: &ToolCallFragment) {
        let entry = self.tool_calls.entry(fragment.index).or_default();

        // First ID and name seen for an index stick
        if entry.id.is_none() {
            entry.id = fragment.id.clone();
        }
        if entry.name.is_empty() {
            if let Some(ref name) = fragment.name {
                entry.name = name.clone();
            }
        }
        if let Some(ref args) = fragment.arguments {
            entry.arguments.push_str(args);
        }
    }

    fn is_empty(&self) -> bool {
        self.tool_calls.is_empty()
    }

    fn finalize(self) -> Vec<ToolCall> {
        self.tool_calls
            .into_iter()
            .map(|(index, acc)| {
                if acc.id.is_none() {
                    debug!(index = index, "Tool call assembled without an upstream ID");
                }
                ToolCall {
                    id: acc.id.unwrap_or_default(),
                    call_type: "function".to_string(),
                    function: ToolCallFunction {
                        name: acc.name,
                        arguments: acc.arguments,
                    },
                }
            })
            .collect()
    }
}

/// Folds canonical chunks into an [`AggregateResponse`].
///
/// Assembly is a pure function of the chunks and metadata: the same input
/// always yields an identical response. With a token counter attached,
/// completion tokens are estimated from the text when the provider never
/// reported any.
#[derive(Debug, Clone, Default)]
pub struct ResponseAssembler {
    token_counter: Option<SharedTokenCounter>,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimate missing completion usage with `counter`
    pub fn with_token_counter(mut self, counter: SharedTokenCounter) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Assemble chunks for `model`, leaving `id` empty and `created` at zero.
    ///
    /// Returns `None` if the chunks carry no content and no finish reason.
    pub fn assemble(&self, chunks: &[CanonicalChunk], model: &str) -> Option<AggregateResponse> {
        self.assemble_with_metadata(chunks, &StreamMetadata::for_model(model))
    }

    /// Assemble chunks, taking `id`, `model` and `created` from `metadata`
    pub fn assemble_with_metadata(
        &self,
        chunks: &[CanonicalChunk],
        metadata: &StreamMetadata,
    ) -> Option<AggregateResponse> {
        let mut content = String::new();
        let mut reasoning = String::new();
        let mut tool_calls = ToolCallAccumulator::default();
        let mut finish_reason: Option<FinishReason> = None;
        let mut usage = UsagePartial::default();

        for chunk in chunks {
            if let Some(text) = &chunk.delta_text {
                content.push_str(text);
            }
            if let Some(text) = &chunk.delta_reasoning {
                reasoning.push_str(text);
            }
            if let Some(fragment) = &chunk.delta_tool_call {
                tool_calls.accumulate(fragment);
            }
            if let Some(reason) = chunk.finish_reason {
                finish_reason = Some(reason);
            }
            if let Some(partial) = &chunk.usage_partial {
                usage.merge(partial);
            }
        }

        if content.is_empty() && reasoning.is_empty() && tool_calls.is_empty() && finish_reason.is_none() {
            return None;
        }

        let mut usage = Usage::from_partial(&usage);
        if usage.completion_tokens == 0 && !content.is_empty() {
            if let Some(estimated) = self.estimate_completion_tokens(&metadata.model, &content) {
                usage = usage.with_completion_tokens(estimated);
            }
        }

        let message = ChoiceMessage {
            role: Role::Assistant,
            content: (!content.is_empty()).then_some(content),
            tool_calls: (!tool_calls.is_empty()).then(|| tool_calls.finalize()),
            reasoning_content: (!reasoning.is_empty()).then_some(reasoning),
        };

        Some(AggregateResponse {
            id: metadata.id.clone(),
            object: AggregateResponse::OBJECT.to_string(),
            created: metadata.created,
            model: metadata.model.clone(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason,
            }],
            usage,
        })
    }

    fn estimate_completion_tokens(&self, model: &str, content: &str) -> Option<u64> {
        let counter = self.token_counter.as_ref()?;
        match counter.count_tokens(model, content) {
            Ok(count) => {
                warn!(
                    model = %model,
                    estimated_output = count,
                    content_len = content.len(),
                    "Using estimated completion tokens - upstream reported no usage"
                );
                crate::metrics::record_fallback_estimation(model);
                Some(count as u64)
            }
            Err(e) => {
                warn!(model = %model, error = %e, "Completion token estimation failed");
                None
            }
        }
    }
}
