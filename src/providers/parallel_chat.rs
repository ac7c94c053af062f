//! Parallel chat completions adapter.
//!
//! Speaks the OpenAI-compatible completions protocol Parallel exposes:
//! `data:` frames carrying `choices[0].delta.content`, a literal
//! `[DONE]` terminator, and an occasional top-level `citations` array.
//! One frame can carry both citations and content, so decode keeps a
//! small queue of chunks per frame.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, Citation, Provider};
use crate::providers::{ChatProvider, ChunkStream, ProviderError, ProviderOptions, StreamChunk};
use crate::sse::parser::{frame_stream, SseFrame};
use crate::sse::DONE_MARKER;
use crate::traits::{Headers, HttpClient, HttpError};

pub const PARALLEL_CHAT_URL: &str = "https://api.parallel.ai/chat/completions";

/// Model used when the request names none
const DEFAULT_PARALLEL_MODEL: &str = "speed";
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    stream: bool,
}

/// One streamed completion frame. Every field is lenient; frames that
/// carry neither content nor citations decode to nothing.
#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    citations: Vec<Citation>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    delta: CompletionDelta,
}

#[derive(Debug, Deserialize, Default)]
struct CompletionDelta {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionChunk {
    /// Chunks carried by this frame, the content delta before citations
    fn into_chunks(self) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        if let Some(content) = self.choices.into_iter().next().and_then(|c| c.delta.content) {
            if !content.is_empty() {
                chunks.push(StreamChunk::Text(content));
            }
        }
        if !self.citations.is_empty() {
            chunks.push(StreamChunk::Citations(self.citations));
        }
        chunks
    }
}

/// Adapter for Parallel's streaming chat API
pub struct ParallelChatProvider {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl ParallelChatProvider {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: PARALLEL_CHAT_URL.to_string(),
        }
    }

    pub fn with_base_url(http: Arc<dyn HttpClient>, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait::async_trait]
impl ChatProvider for ParallelChatProvider {
    fn provider(&self) -> Provider {
        Provider::ParallelChat
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        api_key: &str,
        options: &ProviderOptions,
    ) -> Result<ChunkStream, ProviderError> {
        let request = CompletionRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_PARALLEL_MODEL.to_string()),
            messages: messages.to_vec(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream: true,
        };
        let body = serde_json::to_string(&request).map_err(|e| ProviderError::InvalidResponse {
            message: format!("Failed to encode request: {}", e),
        })?;

        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers.insert("x-api-key".to_string(), api_key.to_string());

        let bytes = self
            .http
            .post_stream(&self.base_url, &body, &headers)
            .await
            .map_err(ProviderError::from_setup)?;

        Ok(decode_completions(frame_stream(bytes)))
    }
}

struct DecodeState {
    frames: Pin<Box<dyn Stream<Item = Result<SseFrame, HttpError>> + Send>>,
    pending: VecDeque<StreamChunk>,
    finished: bool,
}

/// Map completion frames to chunks. `[DONE]` ends the stream; so does
/// plain exhaustion, since some responses never send the terminator.
fn decode_completions(
    frames: Pin<Box<dyn Stream<Item = Result<SseFrame, HttpError>> + Send>>,
) -> ChunkStream {
    let state = DecodeState {
        frames,
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(chunk) = state.pending.pop_front() {
                return Some((chunk, state));
            }
            if state.finished {
                return None;
            }
            match state.frames.next().await {
                Some(Ok(frame)) => {
                    if frame.data == DONE_MARKER {
                        state.finished = true;
                        return Some((StreamChunk::Done, state));
                    }
                    match serde_json::from_str::<CompletionChunk>(&frame.data) {
                        Ok(parsed) => state.pending.extend(parsed.into_chunks()),
                        Err(e) => {
                            tracing::debug!("Skipping malformed completion frame: {}", e);
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((StreamChunk::Error(e.to_string()), state));
                }
                None => {
                    state.finished = true;
                    return Some((StreamChunk::Done, state));
                }
            }
        }
    }))
}
