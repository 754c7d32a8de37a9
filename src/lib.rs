//! Sentinel passthrough - telemetry for transparent LLM proxying
//!
//! Reconstructs Anthropic Messages API traffic (streamed or not) into one
//! canonical response and builds the logging payload for it: cost, end-user
//! attribution and a standard logging object. The crate does no network I/O;
//! the embedding proxy forwards bytes and hands them over.

pub mod config;
pub mod error;
pub mod metrics;
pub mod native;
pub mod payload;
pub mod proxy;
pub mod streaming;
pub mod tokens;

pub use crate::config::Config;
pub use crate::error::{HandlerResult, PassthroughError};
pub use crate::native::{AggregateResponse, CanonicalChunk, FinishReason};
pub use crate::payload::{CostCalculator, LoggingPayload, LoggingPayloadBuilder, StandardLoggingBuilder};
pub use crate::proxy::{PassthroughLoggingHandler, PassthroughResult, RequestContext};
pub use crate::streaming::{StreamError, StreamPipeline};
pub use crate::tokens::SharedTokenCounter;
