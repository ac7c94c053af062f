//! Relay wire events.
//!
//! The relay normalizes every provider into one `text/event-stream`
//! framing: each event is a `data: <json>` line whose single
//! distinguishing key names the payload, closed by a literal
//! `data: [DONE]`. This module holds the typed event union, its
//! decoder, and the stateful encoder that inserts the one-shot
//! `textStart`/`thinkingStart` markers.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::Citation;
use crate::providers::{StreamChunk, TaskProgress};

/// Literal terminator payload ending a successful stream
pub const DONE_MARKER: &str = "[DONE]";

/// Failure decoding a relay data payload
#[derive(Debug, Clone, PartialEq)]
pub enum SseParseError {
    /// Payload was not valid JSON
    InvalidJson { message: String },
    /// Valid JSON that matches no known event shape
    UnknownShape { payload: String },
}

impl std::fmt::Display for SseParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SseParseError::InvalidJson { message } => {
                write!(f, "Invalid JSON in event data: {}", message)
            }
            SseParseError::UnknownShape { payload } => {
                write!(f, "Unrecognized event shape: {}", payload)
            }
        }
    }
}

impl std::error::Error for SseParseError {}

/// One relay wire event.
///
/// Untagged: each variant is identified by its required key, which is
/// how the browser client dispatched on these payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayEvent {
    /// Text delta
    Text { text: String },
    /// Thinking delta
    Thinking { thinking: String },
    /// Citation batch (additive)
    Citations { citations: Vec<Citation> },
    /// Research progress report
    Progress { progress: TaskProgress },
    /// Terminal error; the stream closes after this
    Error { error: String },
    /// Marker before the first thinking delta
    ThinkingStart {
        #[serde(rename = "thinkingStart")]
        thinking_start: bool,
    },
    /// Marker before the first text delta
    TextStart {
        #[serde(rename = "textStart")]
        text_start: bool,
    },
}

impl RelayEvent {
    /// Parse one data payload (not the `[DONE]` marker, which is
    /// handled before JSON decoding)
    pub fn parse(data: &str) -> Result<Self, SseParseError> {
        let value: serde_json::Value =
            serde_json::from_str(data).map_err(|e| SseParseError::InvalidJson {
                message: e.to_string(),
            })?;
        serde_json::from_value(value).map_err(|_| SseParseError::UnknownShape {
            payload: data.to_string(),
        })
    }

    /// Map to a chunk; the start markers carry no chunk of their own
    pub fn into_chunk(self) -> Option<StreamChunk> {
        match self {
            RelayEvent::Text { text } => Some(StreamChunk::Text(text)),
            RelayEvent::Thinking { thinking } => Some(StreamChunk::Thinking(thinking)),
            RelayEvent::Citations { citations } => Some(StreamChunk::Citations(citations)),
            RelayEvent::Progress { progress } => Some(StreamChunk::Progress(progress)),
            RelayEvent::Error { error } => Some(StreamChunk::Error(error)),
            RelayEvent::ThinkingStart { .. } | RelayEvent::TextStart { .. } => None,
        }
    }
}

/// Decode one data payload to a chunk.
///
/// `Ok(None)` means a well-formed payload that produces no chunk
/// (the start markers).
pub fn decode_data(data: &str) -> Result<Option<StreamChunk>, SseParseError> {
    if data == DONE_MARKER {
        return Ok(Some(StreamChunk::Done));
    }
    Ok(RelayEvent::parse(data)?.into_chunk())
}

/// Stateful chunk-to-wire encoder.
///
/// Tracks whether text/thinking deltas have started so the start
/// markers go out exactly once, before the first delta of each kind.
/// An empty delta produces only its marker.
#[derive(Debug, Default)]
pub struct WireEncoder {
    text_started: bool,
    thinking_started: bool,
}

impl WireEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one chunk as zero or more `data:` events
    pub fn encode(&mut self, chunk: &StreamChunk) -> String {
        match chunk {
            StreamChunk::Text(delta) => {
                let mut out = String::new();
                if !self.text_started {
                    self.text_started = true;
                    out.push_str(&event_line(&json!({ "textStart": true })));
                }
                if !delta.is_empty() {
                    out.push_str(&event_line(&json!({ "text": delta })));
                }
                out
            }
            StreamChunk::Thinking(delta) => {
                let mut out = String::new();
                if !self.thinking_started {
                    self.thinking_started = true;
                    out.push_str(&event_line(&json!({ "thinkingStart": true })));
                }
                if !delta.is_empty() {
                    out.push_str(&event_line(&json!({ "thinking": delta })));
                }
                out
            }
            StreamChunk::Citations(citations) => event_line(&json!({ "citations": citations })),
            StreamChunk::Progress(progress) => event_line(&json!({ "progress": progress })),
            StreamChunk::Error(error) => event_line(&json!({ "error": error })),
            StreamChunk::Done => format!("data: {}\n\n", DONE_MARKER),
        }
    }
}

fn event_line(payload: &serde_json::Value) -> String {
    format!("data: {}\n\n", payload)
}
