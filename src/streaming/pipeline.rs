//! Stream pipeline
//!
//! Drives decode, normalize and assemble for a single streamed request.

use futures::{Stream, StreamExt};
use tracing::{debug, info, trace, warn};

use super::assembler::{ResponseAssembler, StreamMetadata};
use super::decoder::{Frame, FrameDecoder};
use super::events::GenericEvent;
use super::normalizer::EventNormalizer;
use super::{SseLineBuffer, StreamError};
use crate::metrics;
use crate::native::chunk::CanonicalChunk;
use crate::native::response::AggregateResponse;

/// Lifecycle of one streamed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Frames are arriving but none has produced a chunk yet
    Streaming,
    /// At least one chunk has been collected
    Accumulating,
    /// The stream ended and chunks are being folded
    Assembling,
    /// A response was assembled
    Complete,
    /// The stream ended without anything to assemble
    Empty,
    /// The stream failed; collected chunks were discarded
    Aborted,
}

impl PipelineState {
    /// True once no further frames will be consumed
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Complete | PipelineState::Empty | PipelineState::Aborted
        )
    }

    fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Streaming => "streaming",
            PipelineState::Accumulating => "accumulating",
            PipelineState::Assembling => "assembling",
            PipelineState::Complete => "complete",
            PipelineState::Empty => "empty",
            PipelineState::Aborted => "aborted",
        }
    }
}

/// Whether the caller should keep feeding frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Continue,
    Finished,
}

/// Per-request stream reconstruction.
///
/// Frames are consumed strictly in order. Once the provider ends the stream
/// (`message_stop` or `[DONE]`) further frames are ignored; once a frame
/// fails the pipeline is aborted and further frames are never decoded.
///
/// # Example
/// ```
/// use sentinel_passthrough::streaming::StreamPipeline;
///
/// let mut pipeline = StreamPipeline::new("claude-3-5-haiku", 0);
/// let response = pipeline
///     .collect_frames([
///         r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#,
///         r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":1}}"#,
///         r#"data: {"type":"message_stop"}"#,
///     ])
///     .unwrap()
///     .unwrap();
/// assert_eq!(response.content(), Some("Hi"));
/// ```
#[derive(Debug)]
pub struct StreamPipeline {
    decoder: FrameDecoder,
    normalizer: EventNormalizer,
    assembler: ResponseAssembler,
    line_buffer: SseLineBuffer,
    chunks: Vec<CanonicalChunk>,
    state: PipelineState,
    ended: bool,
    created: i64,
    frames_seen: usize,
}

impl StreamPipeline {
    /// Create a pipeline for a request to `model`, stamping `created` on the result
    pub fn new(model: impl Into<String>, created: i64) -> Self {
        Self {
            decoder: FrameDecoder::new(),
            normalizer: EventNormalizer::with_model(model),
            assembler: ResponseAssembler::new(),
            line_buffer: SseLineBuffer::new(),
            chunks: Vec::new(),
            state: PipelineState::Streaming,
            ended: false,
            created,
            frames_seen: 0,
        }
    }

    /// Use a specific assembler (e.g. one with a token counter)
    pub fn with_assembler(mut self, assembler: ResponseAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Chunks collected so far
    pub fn chunks(&self) -> &[CanonicalChunk] {
        &self.chunks
    }

    /// Number of frames decoded so far
    pub fn frames_seen(&self) -> usize {
        self.frames_seen
    }

    /// Feed one raw SSE line.
    ///
    /// # Errors
    ///
    /// A malformed frame or an upstream `error` event aborts the pipeline and
    /// is returned. Feeding an aborted pipeline is a no-op.
    pub fn feed(&mut self, raw: &str) -> Result<Progress, StreamError> {
        if self.ended || self.state.is_terminal() {
            return Ok(Progress::Finished);
        }
        self.frames_seen += 1;

        let frame = match self.decoder.decode(raw) {
            Ok(frame) => frame,
            Err(e) => return Err(self.abort(e)),
        };

        match frame {
            Frame::Skip => {
                metrics::record_frame("skipped");
                Ok(Progress::Continue)
            }
            Frame::EndOfStream => {
                metrics::record_frame("end_of_stream");
                self.ended = true;
                Ok(Progress::Finished)
            }
            Frame::Event(event) => {
                trace!(event = event.kind(), frame = self.frames_seen, "Normalizing event");
                self.normalize(event)
            }
        }
    }

    fn normalize(&mut self, event: GenericEvent) -> Result<Progress, StreamError> {
        match self.normalizer.normalize(event) {
            Ok(Some(chunk)) => {
                metrics::record_frame("chunk");
                if chunk.is_semantic() {
                    self.state = PipelineState::Accumulating;
                }
                self.chunks.push(chunk);
                Ok(Progress::Continue)
            }
            Ok(None) => {
                metrics::record_frame("event");
                if self.normalizer.is_stopped() {
                    self.ended = true;
                    return Ok(Progress::Finished);
                }
                Ok(Progress::Continue)
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    /// Feed a transport chunk that may hold several lines, or part of one
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Progress, StreamError> {
        for line in self.line_buffer.feed(bytes) {
            if self.feed(&line)? == Progress::Finished {
                return Ok(Progress::Finished);
            }
        }
        Ok(if self.ended || self.state.is_terminal() {
            Progress::Finished
        } else {
            Progress::Continue
        })
    }

    /// Abort because the transport failed or the client went away.
    ///
    /// Returns `None` once the provider has already ended the stream or the
    /// pipeline is terminal; the collected chunks are then kept.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Option<StreamError> {
        let reason = reason.into();
        if self.ended || self.state.is_terminal() {
            debug!(
                reason = %reason,
                state = self.state.as_str(),
                "Transport failure after end of stream ignored"
            );
            return None;
        }
        Some(self.abort(StreamError::Transport(reason)))
    }

    fn abort(&mut self, error: StreamError) -> StreamError {
        warn!(
            error = %error,
            kind = error.kind(),
            state = self.state.as_str(),
            frames = self.frames_seen,
            discarded_chunks = self.chunks.len(),
            "Stream aborted"
        );
        self.chunks.clear();
        self.state = PipelineState::Aborted;
        metrics::record_stream(PipelineState::Aborted.as_str());
        error
    }

    /// End the stream and assemble whatever was collected.
    ///
    /// Returns `Ok(None)` if the stream carried nothing to assemble or was
    /// aborted earlier.
    ///
    /// # Errors
    ///
    /// A trailing line left in the buffer without a newline is decoded first;
    /// if it is malformed the pipeline aborts and the error is returned.
    pub fn finish(&mut self) -> Result<Option<AggregateResponse>, StreamError> {
        if self.state == PipelineState::Aborted {
            return Ok(None);
        }

        if let Some(rest) = self.line_buffer.take_remaining() {
            self.feed(&rest)?;
        }

        if !self.state.is_terminal() {
            self.state = PipelineState::Assembling;
            // The normalizer tally also covers usage from message_start
            let tally = *self.normalizer.usage();
            if !tally.is_empty() {
                self.chunks.push(CanonicalChunk::usage(tally));
            }
        }

        let metadata = StreamMetadata {
            id: self.normalizer.message_id().unwrap_or_default().to_string(),
            model: self.normalizer.model().unwrap_or_default().to_string(),
            created: self.created,
        };
        let response = self.assembler.assemble_with_metadata(&self.chunks, &metadata);

        let was_terminal = self.state.is_terminal();
        self.state = if response.is_some() {
            PipelineState::Complete
        } else {
            PipelineState::Empty
        };

        if !was_terminal {
            metrics::record_stream(self.state.as_str());
            match &response {
                Some(response) => {
                    metrics::record_tokens("prompt", response.usage.prompt_tokens, &response.model);
                    metrics::record_tokens(
                        "completion",
                        response.usage.completion_tokens,
                        &response.model,
                    );
                    info!(
                        model = %response.model,
                        frames = self.frames_seen,
                        chunks = self.chunks.len(),
                        prompt_tokens = response.usage.prompt_tokens,
                        completion_tokens = response.usage.completion_tokens,
                        "Stream assembled"
                    );
                }
                None => {
                    debug!(
                        model = %metadata.model,
                        frames = self.frames_seen,
                        "Stream ended with nothing to assemble"
                    );
                }
            }
        }

        Ok(response)
    }

    /// Run a complete sequence of collected frames through the pipeline.
    ///
    /// Each item is one frame or several newline-separated frames.
    pub fn collect_frames<I, S>(&mut self, frames: I) -> Result<Option<AggregateResponse>, StreamError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        'frames: for item in frames {
            for line in item.as_ref().lines() {
                if self.feed(line)? == Progress::Finished {
                    break 'frames;
                }
            }
        }
        self.finish()
    }

    /// Consume a transport byte stream until the provider ends it.
    ///
    /// A transport error aborts the pipeline with [`StreamError::Transport`].
    pub async fn collect_stream<St, B, E>(
        &mut self,
        stream: St,
    ) -> Result<Option<AggregateResponse>, StreamError>
    where
        St: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        futures::pin_mut!(stream);
        while let Some(item) = stream.next().await {
            match item {
                Ok(bytes) => {
                    if self.feed_bytes(bytes.as_ref())? == Progress::Finished {
                        break;
                    }
                }
                Err(e) => {
                    if let Some(err) = self.cancel(e.to_string()) {
                        return Err(err);
                    }
                    break;
                }
            }
        }
        self.finish()
    }
}
