//! Frame decoding
//!
//! Turns one raw SSE line from the upstream transport into a provider event.

use super::events::GenericEvent;
use super::StreamError;

/// Terminal sentinel some transports append after the last event
pub const DONE_MARKER: &str = "[DONE]";

/// Longest slice of a bad frame quoted in error messages
const MAX_QUOTED_FRAME: usize = 200;

/// Outcome of decoding a single frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A provider event to normalize
    Event(GenericEvent),
    /// A line that carries no event (event names, comments, blank lines)
    Skip,
    /// The provider signalled the end of the stream
    EndOfStream,
}

/// Stateless decoder for Anthropic SSE lines.
///
/// Only `data:` lines carry events. The `event:` line that precedes each one
/// repeats the JSON `type` field and is skipped, as are SSE comments and the
/// `id:`/`retry:` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one raw frame.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::MalformedFrame`] if a `data:` payload is not a
    /// valid event envelope, or if the line is not an SSE field at all.
    pub fn decode(&self, raw: &str) -> Result<Frame, StreamError> {
        let line = raw.trim_end_matches(['\r', '\n']);

        if let Some(position) = line.find("data:") {
            return Self::decode_data(&line[position + "data:".len()..]);
        }

        let trimmed = line.trim_start();
        if trimmed.is_empty()
            || trimmed.starts_with(':')
            || trimmed.starts_with("event:")
            || trimmed.starts_with("id:")
            || trimmed.starts_with("retry:")
        {
            return Ok(Frame::Skip);
        }

        Err(StreamError::MalformedFrame(format!(
            "not an SSE field: {}",
            quote(line)
        )))
    }

    fn decode_data(payload: &str) -> Result<Frame, StreamError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Ok(Frame::Skip);
        }
        if payload == DONE_MARKER {
            return Ok(Frame::EndOfStream);
        }

        serde_json::from_str::<GenericEvent>(payload)
            .map(Frame::Event)
            .map_err(|e| StreamError::MalformedFrame(format!("{} in {}", e, quote(payload))))
    }
}

fn quote(text: &str) -> String {
    if text.len() <= MAX_QUOTED_FRAME {
        return format!("'{}'", text);
    }
    let mut end = MAX_QUOTED_FRAME;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("'{}…'", &text[..end])
}
