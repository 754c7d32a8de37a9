//! Response cost calculation
//!
//! [`CostCalculator`] is the seam the payload builder prices responses
//! through. [`PricingTable`] is the built-in implementation, priced per
//! million tokens like the model configuration Sentinel receives from Zion.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::native::response::AggregateResponse;

/// Errors from cost calculation
#[derive(Debug, Error, PartialEq)]
pub enum CostError {
    #[error("No pricing configured for model '{0}'")]
    UnknownModel(String),

    #[error("Invalid pricing for model '{model}': {reason}")]
    InvalidPricing { model: String, reason: String },
}

/// Computes the monetary cost of a response
pub trait CostCalculator: Send + Sync {
    /// Cost in USD of `response` when served by `model`
    fn compute_cost(&self, response: &AggregateResponse, model: &str) -> Result<f64, CostError>;
}

/// Per-million-token prices for one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Input token price per million
    pub input_price_per_million: f64,
    /// Output token price per million
    pub output_price_per_million: f64,
    /// Prompt cache write price per million
    pub cache_write_price_per_million: f64,
    /// Prompt cache read price per million
    pub cache_read_price_per_million: f64,
}

impl ModelPricing {
    /// Pricing with Anthropic's standard cache multipliers (1.25x write, 0.1x read)
    pub fn new(input_price_per_million: f64, output_price_per_million: f64) -> Self {
        Self {
            input_price_per_million,
            output_price_per_million,
            cache_write_price_per_million: input_price_per_million * 1.25,
            cache_read_price_per_million: input_price_per_million * 0.1,
        }
    }

    fn validate(&self, model: &str) -> Result<(), CostError> {
        let prices = [
            self.input_price_per_million,
            self.output_price_per_million,
            self.cache_write_price_per_million,
            self.cache_read_price_per_million,
        ];
        if prices.iter().all(|p| p.is_finite() && *p >= 0.0) {
            Ok(())
        } else {
            Err(CostError::InvalidPricing {
                model: model.to_string(),
                reason: "prices must be finite and non-negative".to_string(),
            })
        }
    }

    /// Cost in USD of a response's usage
    pub fn cost(&self, response: &AggregateResponse) -> f64 {
        let usage = &response.usage;
        let per_token = |count: u64, price_per_million: f64| count as f64 * price_per_million / 1_000_000.0;

        per_token(usage.uncached_prompt_tokens(), self.input_price_per_million)
            + per_token(usage.cache_creation_input_tokens, self.cache_write_price_per_million)
            + per_token(usage.cache_read_input_tokens, self.cache_read_price_per_million)
            + per_token(usage.completion_tokens, self.output_price_per_million)
    }
}

static ANTHROPIC_PRICING: Lazy<HashMap<&'static str, ModelPricing>> = Lazy::new(|| {
    HashMap::from([
        ("claude-3-haiku", ModelPricing::new(0.25, 1.25)),
        ("claude-3-sonnet", ModelPricing::new(3.0, 15.0)),
        ("claude-3-opus", ModelPricing::new(15.0, 75.0)),
        ("claude-3-5-haiku", ModelPricing::new(0.80, 4.0)),
        ("claude-3-5-sonnet", ModelPricing::new(3.0, 15.0)),
        ("claude-3-7-sonnet", ModelPricing::new(3.0, 15.0)),
        ("claude-sonnet-4", ModelPricing::new(3.0, 15.0)),
        ("claude-opus-4", ModelPricing::new(15.0, 75.0)),
    ])
});

/// Model-name keyed price list.
///
/// Lookup tries the exact name, then the name without an `anthropic/`
/// prefix, then the longest configured prefix, so dated releases such as
/// `claude-3-5-sonnet-20241022` resolve to their family's price.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    prices: HashMap<String, ModelPricing>,
}

impl PricingTable {
    /// Empty table; every model is unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with Anthropic list prices
    pub fn anthropic() -> Self {
        Self {
            prices: ANTHROPIC_PRICING
                .iter()
                .map(|(model, pricing)| (model.to_string(), *pricing))
                .collect(),
        }
    }

    /// Add or replace the pricing for a model
    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.prices.insert(model.into(), pricing);
        self
    }

    /// Find the pricing that applies to `model`
    pub fn lookup(&self, model: &str) -> Option<&ModelPricing> {
        if let Some(pricing) = self.prices.get(model) {
            return Some(pricing);
        }
        let bare = model.strip_prefix("anthropic/").unwrap_or(model);
        if let Some(pricing) = self.prices.get(bare) {
            return Some(pricing);
        }
        self.prices
            .iter()
            .filter(|(prefix, _)| bare.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, pricing)| pricing)
    }
}

impl CostCalculator for PricingTable {
    fn compute_cost(&self, response: &AggregateResponse, model: &str) -> Result<f64, CostError> {
        let pricing = self
            .lookup(model)
            .ok_or_else(|| CostError::UnknownModel(model.to_string()))?;
        pricing.validate(model)?;
        Ok(pricing.cost(response))
    }
}
