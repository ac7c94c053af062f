//! SSE line and frame parsing.
//!
//! Both wire formats the crate speaks are SSE: the relay framing
//! (`data: <json>` and the `data: [DONE]` terminator) and Anthropic's
//! `event:`/`data:` pairs. The parser here is format-agnostic: it turns
//! a byte stream into raw frames and leaves payload interpretation to
//! the consumer.

use std::collections::VecDeque;

use futures::stream::{self, Stream};
use futures_util::StreamExt;

use crate::traits::http::{BytesStream, HttpError};

/// A single classified SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// `event: <type>`
    Event(String),
    /// `data: <payload>`
    Data(String),
    /// `: comment` or anything unrecognized
    Comment(String),
    /// Blank line, dispatches the pending frame
    Empty,
}

/// Classify one SSE line
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.is_empty() {
        return SseLine::Empty;
    }
    if let Some(stripped) = line.strip_prefix(':') {
        return SseLine::Comment(stripped.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("event:") {
        return SseLine::Event(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("data:") {
        return SseLine::Data(rest.trim().to_string());
    }
    SseLine::Comment(line.to_string())
}

/// One dispatched SSE frame: optional event name plus its data payload
#[derive(Debug, Clone, PartialEq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Stateful frame assembler.
///
/// Accumulates `event:` and `data:` lines and emits a frame on each
/// blank line, per the SSE wire format.
#[derive(Debug, Default)]
pub struct SseParser {
    current_event_type: Option<String>,
    data_buffer: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a line; returns a frame when a blank line completes one
    pub fn feed_line(&mut self, line: &str) -> Option<SseFrame> {
        match parse_sse_line(line) {
            SseLine::Event(event_type) => {
                self.current_event_type = Some(event_type);
                None
            }
            SseLine::Data(data) => {
                self.data_buffer.push(data);
                None
            }
            SseLine::Empty => self.take_frame(),
            SseLine::Comment(_) => None,
        }
    }

    /// Emit whatever is buffered; used at end of stream when the final
    /// frame was not followed by a blank line.
    pub fn flush(&mut self) -> Option<SseFrame> {
        self.take_frame()
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        if self.current_event_type.is_none() && self.data_buffer.is_empty() {
            return None;
        }
        let event = self.current_event_type.take();
        let data = self.data_buffer.join("\n");
        self.data_buffer.clear();
        Some(SseFrame { event, data })
    }
}

struct FrameStreamState {
    bytes: BytesStream,
    parser: SseParser,
    buffer: String,
    pending: VecDeque<SseFrame>,
    finished: bool,
}

/// Decode a byte stream into SSE frames.
///
/// Bytes accumulate in a line buffer; completed lines feed the parser.
/// A transport error ends the stream after being yielded. At normal end
/// of stream any buffered trailing frame is flushed.
pub fn frame_stream(
    bytes: BytesStream,
) -> std::pin::Pin<Box<dyn Stream<Item = Result<SseFrame, HttpError>> + Send>> {
    let state = FrameStreamState {
        bytes,
        parser: SseParser::new(),
        buffer: String::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(newline) = state.buffer.find('\n') {
                        let line: String = state.buffer.drain(..=newline).collect();
                        let line = line.trim_end_matches('\n').trim_end_matches('\r');
                        if let Some(frame) = state.parser.feed_line(line) {
                            state.pending.push_back(frame);
                        }
                    }
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    if !state.buffer.is_empty() {
                        let trailing = std::mem::take(&mut state.buffer);
                        if let Some(frame) = state.parser.feed_line(trailing.trim_end_matches('\r'))
                        {
                            state.pending.push_back(frame);
                        }
                    }
                    if let Some(frame) = state.parser.flush() {
                        state.pending.push_back(frame);
                    }
                }
            }
        }
    }))
}
