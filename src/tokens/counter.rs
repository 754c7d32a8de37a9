//! Token counter implementation
//!
//! Uses tiktoken-rs to estimate completion tokens when a stream ended without
//! the provider ever reporting usage. Anthropic models have no public BPE, so
//! they are counted with the configured fallback encoder.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tiktoken_rs::{get_bpe_from_model, CoreBPE};

/// Encoder used when neither the model nor the configured fallback is known
pub const DEFAULT_FALLBACK_MODEL: &str = "gpt-4";

/// Errors from token estimation
#[derive(Debug, Error)]
pub enum TokenCountError {
    #[error("Failed to acquire token counter lock")]
    LockPoisoned,

    #[error("No encoder available for model '{model}': {reason}")]
    NoEncoder { model: String, reason: String },
}

/// Token counter for various models
pub struct TokenCounter {
    /// Cached encoders, keyed by the model they were requested for
    encoders: HashMap<String, CoreBPE>,
    /// Model whose encoder stands in for unknown models
    fallback_model: String,
}

impl TokenCounter {
    /// Create a new token counter with the default fallback encoder
    pub fn new() -> Self {
        Self::with_fallback(DEFAULT_FALLBACK_MODEL)
    }

    /// Create a token counter that counts unknown models with `fallback_model`'s encoder
    pub fn with_fallback(fallback_model: impl Into<String>) -> Self {
        Self {
            encoders: HashMap::new(),
            fallback_model: fallback_model.into(),
        }
    }

    /// Get or create an encoder for a model
    fn encoder(&mut self, model: &str) -> Result<&CoreBPE, TokenCountError> {
        if !self.encoders.contains_key(model) {
            let encoder = match get_bpe_from_model(model) {
                Ok(e) => e,
                Err(e) => {
                    tracing::debug!(
                        model = %model,
                        fallback = %self.fallback_model,
                        error = %e,
                        "No tokenizer for model, using fallback encoder"
                    );
                    get_bpe_from_model(&self.fallback_model).map_err(|e| {
                        TokenCountError::NoEncoder {
                            model: model.to_string(),
                            reason: e.to_string(),
                        }
                    })?
                }
            };
            self.encoders.insert(model.to_string(), encoder);
        }

        self.encoders
            .get(model)
            .ok_or_else(|| TokenCountError::NoEncoder {
                model: model.to_string(),
                reason: "encoder cache miss".to_string(),
            })
    }

    /// Count tokens in a text string
    pub fn count_tokens(&mut self, model: &str, text: &str) -> Result<usize, TokenCountError> {
        let encoder = self.encoder(model)?;
        Ok(encoder.encode_with_special_tokens(text).len())
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe token counter wrapper
///
/// Encoders are loaded lazily and then only read, so one instance is shared
/// by every stream in the process.
#[derive(Clone)]
pub struct SharedTokenCounter {
    inner: Arc<RwLock<TokenCounter>>,
}

impl SharedTokenCounter {
    /// Create a new shared token counter
    pub fn new() -> Self {
        Self::from_counter(TokenCounter::new())
    }

    /// Create a shared counter with a specific fallback encoder model
    pub fn with_fallback(fallback_model: impl Into<String>) -> Self {
        Self::from_counter(TokenCounter::with_fallback(fallback_model))
    }

    fn from_counter(counter: TokenCounter) -> Self {
        Self {
            inner: Arc::new(RwLock::new(counter)),
        }
    }

    /// Count tokens in a text string
    pub fn count_tokens(&self, model: &str, text: &str) -> Result<usize, TokenCountError> {
        let mut counter = self
            .inner
            .write()
            .map_err(|_| TokenCountError::LockPoisoned)?;
        counter.count_tokens(model, text)
    }
}

impl Default for SharedTokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedTokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTokenCounter").finish_non_exhaustive()
    }
}
