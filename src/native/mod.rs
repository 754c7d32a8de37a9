//! Canonical types for passthrough telemetry
//!
//! Provider traffic is reduced to these OpenAI-compatible shapes before it is
//! priced and logged, so the logging layer never sees provider formats.

pub mod chunk;
pub mod response;
pub mod translate;

// Re-export key types for convenience
pub use chunk::{CanonicalChunk, FinishReason, ToolCallFragment, UsagePartial};
pub use response::{AggregateResponse, Choice, ChoiceMessage, Role, ToolCall, ToolCallFunction, Usage};
pub use translate::{AnthropicTranslator, ResponseTranslator, TranslationError};
