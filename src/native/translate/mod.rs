//! Translation from provider response bodies to the canonical format
//!
//! Non-streamed passthrough responses arrive as one provider-shaped JSON body.
//! A [`ResponseTranslator`] converts that body into an [`AggregateResponse`]
//! so the logging layer never sees provider-specific shapes.

pub mod anthropic;

use thiserror::Error;

use super::chunk::FinishReason;
use super::response::AggregateResponse;

/// Errors that can occur during response translation
#[derive(Debug, Error)]
pub enum TranslationError {
    /// Response body does not have the provider's expected shape
    #[error("Invalid response format: {0}")]
    InvalidResponseFormat(String),

    /// The provider returned an error body instead of a message
    #[error("Provider returned an error ({error_type}): {message}")]
    ProviderError { error_type: String, message: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Converts a provider response body into the canonical response
pub trait ResponseTranslator {
    /// Translate provider response JSON to the canonical format.
    ///
    /// `created` is stamped onto the result; provider bodies do not carry a
    /// creation time.
    ///
    /// # Errors
    ///
    /// Returns `TranslationError` if the body is an error envelope or does
    /// not match the provider's message shape.
    fn translate_response(
        &self,
        response: &serde_json::Value,
        created: i64,
    ) -> Result<AggregateResponse, TranslationError>;

    /// Map a provider stop reason to the canonical finish reason
    fn translate_stop_reason(&self, reason: &str) -> FinishReason;
}

pub use anthropic::AnthropicTranslator;
