//! Event normalization
//!
//! Converts Anthropic stream events into canonical chunks while keeping a
//! running token tally for the stream.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::events::{BlockDelta, ContentBlock, GenericEvent};
use super::StreamError;
use crate::native::chunk::{CanonicalChunk, ToolCallFragment, UsagePartial};
use crate::native::translate::anthropic::map_stop_reason;

/// Stateful, single-pass converter for one stream.
///
/// Anthropic numbers content blocks across text and tool use; canonical tool
/// calls are numbered among tool blocks only, so the normalizer keeps the
/// block-index to tool-ordinal mapping.
#[derive(Debug, Default)]
pub struct EventNormalizer {
    usage: UsagePartial,
    model: Option<String>,
    message_id: Option<String>,
    tool_blocks: HashMap<u32, u32>,
    stopped: bool,
}

impl EventNormalizer {
    /// Create a normalizer with no active model
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a normalizer for a request whose model is already known.
    ///
    /// A model named by `message_start` does not replace this one.
    pub fn with_model(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            model: (!model.is_empty()).then_some(model),
            ..Self::default()
        }
    }

    /// Running usage tally
    pub fn usage(&self) -> &UsagePartial {
        &self.usage
    }

    /// Active model name
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Upstream message ID, once `message_start` has been seen
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// True once `message_stop` has been seen
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Normalize one event.
    ///
    /// Returns `Ok(None)` for events that carry no content (start/stop
    /// markers, keep-alives).
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::UpstreamStreamError`] for an in-stream `error`
    /// event. The caller must stop consuming the stream.
    pub fn normalize(&mut self, event: GenericEvent) -> Result<Option<CanonicalChunk>, StreamError> {
        let chunk = match event {
            GenericEvent::MessageStart { message } => {
                if let Some(usage) = &message.usage {
                    self.usage.merge(&UsagePartial::from(usage));
                }
                if self.model.is_none() {
                    self.model = message.model.filter(|m| !m.is_empty());
                }
                self.message_id = message.id;
                None
            }
            GenericEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                ContentBlock::Text { text } if !text.is_empty() => Some(CanonicalChunk::text(text)),
                ContentBlock::Thinking { thinking } if !thinking.is_empty() => {
                    Some(CanonicalChunk::reasoning(thinking))
                }
                ContentBlock::ToolUse { id, name, .. } => {
                    Some(CanonicalChunk::tool_call(ToolCallFragment {
                        index: self.tool_ordinal(index),
                        id: Some(id),
                        name: Some(name),
                        arguments: Some(String::new()),
                    }))
                }
                _ => None,
            },
            GenericEvent::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } => Some(CanonicalChunk::text(text)),
                BlockDelta::ThinkingDelta { thinking } => Some(CanonicalChunk::reasoning(thinking)),
                BlockDelta::InputJsonDelta { partial_json } => Some(CanonicalChunk::tool_call(
                    ToolCallFragment::arguments(self.tool_ordinal(index), partial_json),
                )),
                BlockDelta::SignatureDelta { .. } => None,
                BlockDelta::Other => {
                    debug!(index = index, "Ignoring unsupported content block delta");
                    None
                }
            },
            GenericEvent::ContentBlockStop { .. } => None,
            GenericEvent::MessageDelta { delta, usage } => {
                if let Some(usage) = &usage {
                    self.usage.merge(&UsagePartial::from(usage));
                }
                match delta.stop_reason.as_deref() {
                    Some(reason) => Some(CanonicalChunk::finish(
                        map_stop_reason(reason),
                        Some(self.usage),
                    )),
                    None if usage.is_some() => Some(CanonicalChunk::usage(self.usage)),
                    None => None,
                }
            }
            GenericEvent::MessageStop => {
                self.stopped = true;
                None
            }
            GenericEvent::Ping => None,
            GenericEvent::Error { error } => {
                warn!(
                    error_type = %error.error_type,
                    message = %error.message,
                    model = ?self.model,
                    "Upstream reported an error mid-stream"
                );
                let payload = error.payload();
                return Err(StreamError::UpstreamStreamError {
                    error_type: error.error_type,
                    message: error.message,
                    payload,
                });
            }
            GenericEvent::Unknown => {
                debug!("Ignoring unknown stream event");
                None
            }
        };

        Ok(chunk)
    }

    fn tool_ordinal(&mut self, block_index: u32) -> u32 {
        let next = self.tool_blocks.len() as u32;
        *self.tool_blocks.entry(block_index).or_insert(next)
    }
}
