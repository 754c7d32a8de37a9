//! Passthrough logging handler
//!
//! Entry points the proxy calls once an Anthropic passthrough request has
//! finished (or while its stream is still being forwarded). Each returns the
//! canonical response alongside the logging payload for the telemetry sink.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use super::logging::RequestContext;
use crate::config::Config;
use crate::error::HandlerResult;
use crate::native::response::AggregateResponse;
use crate::native::translate::{AnthropicTranslator, ResponseTranslator};
use crate::payload::{
    CostCalculator, DefaultStandardLogging, LoggingPayload, LoggingPayloadBuilder, PricingTable,
    StandardLoggingBuilder,
};
use crate::streaming::{Progress, ResponseAssembler, StreamError, StreamPipeline};
use crate::tokens::SharedTokenCounter;

/// Canonical response plus the payload to log with it.
///
/// `result` is `None` when nothing could be assembled; downstream logging
/// should then be skipped.
#[derive(Debug, Clone, Serialize)]
pub struct PassthroughResult {
    pub result: Option<AggregateResponse>,
    pub kwargs: LoggingPayload,
}

/// Handles logging for Anthropic passthrough traffic
#[derive(Debug, Clone)]
pub struct PassthroughLoggingHandler {
    translator: AnthropicTranslator,
    assembler: ResponseAssembler,
    payload_builder: LoggingPayloadBuilder,
}

impl PassthroughLoggingHandler {
    /// Create a handler with explicit collaborators
    pub fn new(
        config: &Config,
        cost_calculator: Arc<dyn CostCalculator>,
        standard_logging: Arc<dyn StandardLoggingBuilder>,
    ) -> Self {
        let assembler = if config.estimate_missing_usage {
            ResponseAssembler::new().with_token_counter(SharedTokenCounter::with_fallback(
                config.fallback_encoder_model.clone(),
            ))
        } else {
            ResponseAssembler::new()
        };

        Self {
            translator: AnthropicTranslator::new(),
            assembler,
            payload_builder: LoggingPayloadBuilder::new(cost_calculator, standard_logging)
                .with_config(config),
        }
    }

    /// Create a handler using Anthropic list prices and the built-in standard object
    pub fn with_defaults(config: &Config) -> Self {
        Self::new(
            config,
            Arc::new(PricingTable::anthropic()),
            Arc::new(DefaultStandardLogging::new()),
        )
    }

    /// Pipeline for one streamed request
    pub fn pipeline(&self, model: &str, created: i64) -> StreamPipeline {
        StreamPipeline::new(model, created).with_assembler(self.assembler.clone())
    }

    /// Log a non-streamed Messages API response.
    ///
    /// The model is the one the response names, or the request's if absent.
    pub fn handle_non_streaming(
        &self,
        response_body: &Value,
        context: &RequestContext,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> HandlerResult<PassthroughResult> {
        let _span = context.create_span().entered();
        let mut response = match self
            .translator
            .translate_response(response_body, end_time.timestamp())
        {
            Ok(response) => response,
            Err(e) => {
                context.log_error(&e.to_string());
                return Err(e.into());
            }
        };
        if response.model.is_empty() {
            response.model = context.request_model().to_string();
        }

        let kwargs = self
            .payload_builder
            .build(&mut response, context, start_time, end_time);

        Ok(PassthroughResult {
            result: Some(response),
            kwargs,
        })
    }

    /// Log a stream from the raw frames collected while forwarding it.
    ///
    /// The model is taken from the request body.
    pub fn handle_collected_chunks<I, S>(
        &self,
        all_chunks: I,
        context: &RequestContext,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> HandlerResult<PassthroughResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _span = context.create_span().entered();
        let mut pipeline = self.pipeline(context.request_model(), start_time.timestamp());
        let outcome = pipeline.collect_frames(all_chunks);
        self.complete(outcome, context, start_time, end_time)
    }

    /// Consume a transport byte stream and log it once it ends
    pub async fn handle_stream<St, B, E>(
        &self,
        stream: St,
        context: &RequestContext,
        start_time: DateTime<Utc>,
    ) -> HandlerResult<PassthroughResult>
    where
        St: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let mut pipeline = self.pipeline(context.request_model(), start_time.timestamp());
        context.log_stream_started();
        let outcome = pipeline.collect_stream(stream).await;
        context.log_stream_ended(Some(pipeline.chunks().len()));
        self.complete(outcome, context, start_time, Utc::now())
    }

    /// Forward a transport stream unchanged while reconstructing it.
    ///
    /// Items are yielded exactly as received. When the upstream stream ends
    /// the result is sent on the returned receiver. If the returned stream is
    /// dropped before then, the receiver reports the sender as gone.
    pub fn tap_stream<St, B, E>(
        &self,
        stream: St,
        context: RequestContext,
        start_time: DateTime<Utc>,
    ) -> (
        impl Stream<Item = Result<B, E>>,
        oneshot::Receiver<HandlerResult<PassthroughResult>>,
    )
    where
        St: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let handler = self.clone();
        let (tx, rx) = oneshot::channel();

        let tapped = async_stream::stream! {
            let mut pipeline = handler.pipeline(context.request_model(), start_time.timestamp());
            let mut failure: Option<StreamError> = None;
            let mut finished = false;
            let mut items = 0usize;
            context.log_stream_started();

            futures::pin_mut!(stream);
            while let Some(item) = stream.next().await {
                items += 1;
                // Items after the provider ended the stream are forwarded only
                if failure.is_none() && !finished {
                    match &item {
                        Ok(bytes) => match pipeline.feed_bytes(bytes.as_ref()) {
                            Ok(Progress::Finished) => finished = true,
                            Ok(Progress::Continue) => {}
                            Err(e) => failure = Some(e),
                        },
                        Err(e) => failure = pipeline.cancel(e.to_string()),
                    }
                }
                yield item;
            }

            context.log_stream_ended(Some(items));
            let outcome = match failure {
                Some(e) => Err(e),
                None => pipeline.finish(),
            };
            let result = handler.complete(outcome, &context, start_time, Utc::now());
            if tx.send(result).is_err() {
                tracing::debug!(call_id = %context.short_id(), "Passthrough result receiver dropped");
            }
        };

        (tapped, rx)
    }

    fn complete(
        &self,
        outcome: Result<Option<AggregateResponse>, StreamError>,
        context: &RequestContext,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> HandlerResult<PassthroughResult> {
        match outcome {
            Ok(Some(mut response)) => {
                if response.finish_reason().is_none() {
                    context.log_warning("Stream ended without a stop reason, response may be truncated");
                }
                let kwargs = self
                    .payload_builder
                    .build(&mut response, context, start_time, end_time);
                Ok(PassthroughResult {
                    result: Some(response),
                    kwargs,
                })
            }
            Ok(None) => {
                context.log_error(
                    "Unable to build complete streaming response for Anthropic passthrough endpoint, not logging",
                );
                Ok(PassthroughResult {
                    result: None,
                    kwargs: LoggingPayload::empty(context.call_id.clone(), start_time, end_time),
                })
            }
            Err(e) => {
                context.log_stream_aborted(&e.to_string());
                Err(e.into())
            }
        }
    }
}
