//! SSE stream reconstruction
//!
//! Decodes Anthropic event frames, normalizes them into canonical chunks and
//! assembles those chunks into a single response. [`StreamPipeline`] drives
//! the three stages for one request.

pub mod assembler;
pub mod decoder;
pub mod events;
pub mod normalizer;
pub mod pipeline;

use std::borrow::Cow;

use thiserror::Error;

pub use assembler::{ResponseAssembler, StreamMetadata};
pub use decoder::{Frame, FrameDecoder};
pub use events::GenericEvent;
pub use normalizer::EventNormalizer;
pub use pipeline::{PipelineState, Progress, StreamPipeline};

/// Errors that end consumption of a stream.
///
/// End of stream is not an error; it is [`Frame::EndOfStream`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StreamError {
    /// A frame could not be parsed as a provider event
    #[error("Malformed stream frame: {0}")]
    MalformedFrame(String),

    /// The provider reported an error inside the stream
    #[error("Upstream stream error ({error_type}): {message}")]
    UpstreamStreamError {
        /// Provider error type, e.g. `overloaded_error`
        error_type: String,
        /// Provider error message
        message: String,
        /// The provider's `error` object, including fields not named above
        payload: serde_json::Value,
    },

    /// The transport failed or was cancelled before the stream ended
    #[error("Stream transport failed: {0}")]
    Transport(String),
}

impl StreamError {
    /// Short label for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::MalformedFrame(_) => "malformed_frame",
            StreamError::UpstreamStreamError { .. } => "upstream_error",
            StreamError::Transport(_) => "transport",
        }
    }
}

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
///
/// SSE data arrives as byte chunks that may not align with line boundaries.
/// This buffer accumulates incomplete lines until a complete line (ending with \n)
/// is available for processing.
///
/// # Example
/// ```
/// use sentinel_passthrough::streaming::SseLineBuffer;
///
/// let mut buffer = SseLineBuffer::new();
///
/// let lines1 = buffer.feed(b"data: {\"type\":\"pi");
/// assert!(lines1.is_empty());
///
/// let lines2 = buffer.feed(b"ng\"}\n");
/// assert_eq!(lines2, vec!["data: {\"type\":\"ping\"}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Accumulated incomplete line data, kept as bytes so a UTF-8 sequence
    /// split across chunks is decoded whole
    incomplete: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self {
            incomplete: Vec::new(),
        }
    }

    /// Feed bytes into the buffer and return any complete lines.
    ///
    /// The newline is stripped from returned lines and empty lines are
    /// dropped. Incomplete trailing data is kept for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.extend_from_slice(bytes);

        let mut complete_lines = Vec::new();
        while let Some(newline_pos) = self.incomplete.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.incomplete.drain(..=newline_pos).collect();
            let line = String::from_utf8_lossy(&line[..newline_pos]);

            // SSE separates events with blank lines
            if !line.is_empty() {
                complete_lines.push(line.into_owned());
            }
        }

        complete_lines
    }

    /// Check if there's any incomplete data remaining in the buffer.
    pub fn has_incomplete(&self) -> bool {
        !self.incomplete.is_empty()
    }

    /// Get any remaining incomplete data.
    pub fn remaining(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.incomplete)
    }

    /// Take the remaining incomplete data, leaving the buffer empty.
    ///
    /// Call this once the transport is exhausted to recover a final line
    /// that was sent without a trailing newline.
    pub fn take_remaining(&mut self) -> Option<String> {
        if self.incomplete.is_empty() {
            None
        } else {
            let rest = std::mem::take(&mut self.incomplete);
            Some(String::from_utf8_lossy(&rest).into_owned())
        }
    }
}
