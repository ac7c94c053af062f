//! Server-sent event framing.
//!
//! `parser` turns byte streams into raw SSE frames; `events` maps the
//! relay's data payloads to and from stream chunks.

pub mod events;
pub mod parser;

pub use events::{decode_data, RelayEvent, SseParseError, WireEncoder, DONE_MARKER};
pub use parser::{frame_stream, parse_sse_line, SseFrame, SseLine, SseParser};
