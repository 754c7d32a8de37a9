//! Configuration management for the passthrough logging core
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

use crate::tokens::counter::DEFAULT_FALLBACK_MODEL;

/// Request-body field the proxy uses for its own metadata
pub const DEFAULT_INTERNAL_METADATA_FIELD: &str = "proxy_metadata";

/// Passthrough logging configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Request-body object whose `user` field names the end user
    pub internal_metadata_field: String,

    /// Estimate completion tokens when a stream never reported usage
    pub estimate_missing_usage: bool,
    /// Encoder model used for estimation when the real model has none
    pub fallback_encoder_model: String,

    /// Log the standard logging object at info instead of debug
    pub log_standard_object: bool,
    /// Emit JSON log lines (replay binary only)
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            internal_metadata_field: env::var("PASSTHROUGH_INTERNAL_METADATA_FIELD")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_INTERNAL_METADATA_FIELD.to_string()),

            estimate_missing_usage: parse_bool("PASSTHROUGH_ESTIMATE_MISSING_USAGE", true)?,
            fallback_encoder_model: env::var("PASSTHROUGH_FALLBACK_ENCODER_MODEL")
                .unwrap_or_else(|_| DEFAULT_FALLBACK_MODEL.to_string()),

            log_standard_object: parse_bool("PASSTHROUGH_LOG_STANDARD_OBJECT", false)?,
            log_json: parse_bool("PASSTHROUGH_LOG_JSON", false)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_metadata_field: DEFAULT_INTERNAL_METADATA_FIELD.to_string(),
            estimate_missing_usage: true,
            fallback_encoder_model: DEFAULT_FALLBACK_MODEL.to_string(),
            log_standard_object: false,
            log_json: false,
        }
    }
}

fn parse_bool(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(anyhow::anyhow!("expected a boolean, got '{}'", other))
                .with_context(|| format!("Invalid {}", name)),
        },
        Err(_) => Ok(default),
    }
}
