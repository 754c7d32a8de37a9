//! Error types for the passthrough logging core
//!
//! Layer errors ([`StreamError`], [`TranslationError`]) surface to the caller
//! wrapped in [`PassthroughError`], which also knows the response body a proxy
//! should send when it has to report the failure downstream.

use serde::Serialize;
use thiserror::Error;

use crate::native::translate::TranslationError;
use crate::streaming::StreamError;

/// HTTP status reported for upstream failures
pub const BAD_GATEWAY: u16 = 502;

/// Errors returned by the passthrough logging handler
#[derive(Debug, Error)]
pub enum PassthroughError {
    #[error("Stream failed: {0}")]
    Stream(#[from] StreamError),

    #[error("Response translation failed: {0}")]
    Translation(#[from] TranslationError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Provider-reported error details
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    /// Provider error type, e.g. `overloaded_error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error_type: Option<String>,
    /// Which stage of reconstruction failed
    pub kind: String,
}

impl PassthroughError {
    /// HTTP status a proxy should report for this error
    pub fn status_code(&self) -> u16 {
        BAD_GATEWAY
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        "UPSTREAM_ERROR"
    }

    /// Short label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            PassthroughError::Stream(e) => e.kind(),
            PassthroughError::Translation(TranslationError::ProviderError { .. }) => "upstream_error",
            PassthroughError::Translation(_) => "invalid_response",
        }
    }

    /// Body a proxy can send to its client
    pub fn to_error_response(&self) -> ErrorResponse {
        let provider_error_type = match self {
            PassthroughError::Stream(StreamError::UpstreamStreamError { error_type, .. })
            | PassthroughError::Translation(TranslationError::ProviderError { error_type, .. }) => {
                Some(error_type.clone())
            }
            _ => None,
        };

        ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.to_string(),
                details: Some(ErrorDetails {
                    provider_error_type,
                    kind: self.kind().to_string(),
                }),
            },
        }
    }
}

/// Result type alias for convenience
pub type HandlerResult<T> = Result<T, PassthroughError>;
