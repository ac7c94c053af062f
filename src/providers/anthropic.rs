//! Anthropic messages API adapter.
//!
//! Speaks the streaming messages protocol: a POST with `stream: true`
//! answered by SSE frames whose data payloads are tagged by `type`.
//! Content arrives per block; block starts map to empty deltas so the
//! relay can emit its start markers, and unknown event types are
//! skipped so protocol additions never break a live stream.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::models::{supports_extended_thinking, ChatMessage, Provider, DEFAULT_MODEL};
use crate::providers::{ChatProvider, ChunkStream, ProviderError, ProviderOptions, StreamChunk};
use crate::sse::parser::{frame_stream, SseFrame};
use crate::traits::{Headers, HttpClient, HttpError};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Reasoning budget sent when extended thinking is active
const THINKING_BUDGET_TOKENS: u32 = 10_000;
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    kind: String,
    budget_tokens: u32,
}

impl ThinkingConfig {
    fn enabled() -> Self {
        Self {
            kind: "enabled".to_string(),
            budget_tokens: THINKING_BUDGET_TOKENS,
        }
    }
}

/// Streaming event payload, tagged by its `type` field
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicEvent {
    ContentBlockStart { content_block: ContentBlock },
    ContentBlockDelta { delta: ContentDelta },
    Error { error: AnthropicApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ContentDelta {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    thinking: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicApiError {
    #[serde(default)]
    message: String,
}

impl AnthropicEvent {
    fn into_chunk(self) -> Option<StreamChunk> {
        match self {
            AnthropicEvent::ContentBlockStart { content_block } => {
                match content_block.kind.as_str() {
                    "thinking" => Some(StreamChunk::Thinking(String::new())),
                    "text" => Some(StreamChunk::Text(String::new())),
                    _ => None,
                }
            }
            AnthropicEvent::ContentBlockDelta { delta } => match delta.kind.as_str() {
                "text_delta" => Some(StreamChunk::Text(delta.text)),
                "thinking_delta" => Some(StreamChunk::Thinking(delta.thinking)),
                _ => None,
            },
            AnthropicEvent::Error { error } => Some(StreamChunk::Error(error.message)),
            AnthropicEvent::Other => None,
        }
    }
}

/// Adapter for the Anthropic messages API
pub struct AnthropicProvider {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn with_base_url(http: Arc<dyn HttpClient>, base_url: String) -> Self {
        Self { http, base_url }
    }

    fn build_request(&self, messages: &[ChatMessage], options: &ProviderOptions) -> AnthropicRequest {
        let model = options
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let thinking = if options.extended_thinking && supports_extended_thinking(&model) {
            Some(ThinkingConfig::enabled())
        } else {
            None
        };

        AnthropicRequest {
            model,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: messages.to_vec(),
            stream: true,
            thinking,
        }
    }
}

#[async_trait::async_trait]
impl ChatProvider for AnthropicProvider {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        api_key: &str,
        options: &ProviderOptions,
    ) -> Result<ChunkStream, ProviderError> {
        let request = self.build_request(messages, options);
        let body = serde_json::to_string(&request).map_err(|e| ProviderError::InvalidResponse {
            message: format!("Failed to encode request: {}", e),
        })?;

        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers.insert("x-api-key".to_string(), api_key.to_string());
        headers.insert("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string());

        let bytes = self
            .http
            .post_stream(&self.base_url, &body, &headers)
            .await
            .map_err(ProviderError::from_setup)?;

        Ok(decode_events(frame_stream(bytes)))
    }
}

struct DecodeState {
    frames: Pin<Box<dyn Stream<Item = Result<SseFrame, HttpError>> + Send>>,
    finished: bool,
}

/// Map SSE frames to chunks. Ends with exactly one terminal chunk:
/// an upstream error event or transport fault becomes `Error`, and
/// stream exhaustion becomes `Done`.
fn decode_events(
    frames: Pin<Box<dyn Stream<Item = Result<SseFrame, HttpError>> + Send>>,
) -> ChunkStream {
    let state = DecodeState {
        frames,
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            match state.frames.next().await {
                Some(Ok(frame)) => {
                    match serde_json::from_str::<AnthropicEvent>(&frame.data) {
                        Ok(event) => {
                            if let Some(chunk) = event.into_chunk() {
                                state.finished = chunk.is_terminal();
                                return Some((chunk, state));
                            }
                        }
                        Err(e) => {
                            tracing::debug!("Skipping malformed event payload: {}", e);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MockHttpClient, MockResponse};
    use crate::models::MessageRole;
    use bytes::Bytes;

    fn sse_script() -> Vec<Bytes> {
        vec![
            Bytes::from(
                "event: message_start\n\
                 data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n\
                 event: content_block_start\n\
                 data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"thinking\",\"thinking\":\"\"}}\n\n",
            ),
            Bytes::from(
                "event: content_block_delta\n\
                 data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"considering\"}}\n\n\
                 event: content_block_start\n\
                 data: {\"type\":\"content_block_start\",\"index\":1,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
            ),
            Bytes::from(
                "event: content_block_delta\n\
                 data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n\
                 event: content_block_delta\n\
                 data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n\
                 event: message_stop\n\
                 data: {\"type\":\"message_stop\"}\n\n",
            ),
        ]
    }

    async fn collect(mut stream: ChunkStream) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = stream.next().await {
            chunks.push(chunk);
        }
        chunks
    }

    #[tokio::test]
    async fn test_stream_maps_blocks_and_deltas() {
        let http = MockHttpClient::new();
        http.set_response(ANTHROPIC_API_URL, MockResponse::Stream(sse_script()));

        let provider = AnthropicProvider::new(Arc::new(http));
        let stream = provider
            .stream(
                &[ChatMessage::new(MessageRole::User, "hi")],
                "sk-test",
                &ProviderOptions::default(),
            )
            .await
            .unwrap();

        let chunks = collect(stream).await;
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Thinking(String::new()),
                StreamChunk::Thinking("considering".to_string()),
                StreamChunk::Text(String::new()),
                StreamChunk::Text("Hel".to_string()),
                StreamChunk::Text("lo".to_string()),
                StreamChunk::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_request_headers_and_body() {
        let http = MockHttpClient::new();
        http.set_response(ANTHROPIC_API_URL, MockResponse::Stream(vec![]));
        let http = Arc::new(http);

        let provider = AnthropicProvider::new(Arc::clone(&http) as Arc<dyn HttpClient>);
        let options = ProviderOptions {
            model: Some("claude-opus-4-1-20250805".to_string()),
            max_tokens: Some(2048),
            extended_thinking: true,
        };
        let stream = provider
            .stream(&[ChatMessage::new(MessageRole::User, "hi")], "sk-test", &options)
            .await
            .unwrap();
        collect(stream).await;

        let requests = http.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, ANTHROPIC_API_URL);
        assert_eq!(requests[0].headers.get("x-api-key"), Some(&"sk-test".to_string()));
        assert_eq!(
            requests[0].headers.get("anthropic-version"),
            Some(&ANTHROPIC_VERSION.to_string())
        );

        let body: serde_json::Value =
            serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["model"], "claude-opus-4-1-20250805");
        assert_eq!(body["max_tokens"], 2048);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["thinking"]["type"], "enabled");
        assert_eq!(body["thinking"]["budget_tokens"], 10000);
    }

    #[tokio::test]
    async fn test_thinking_omitted_for_unsupported_model() {
        let http = MockHttpClient::new();
        http.set_response(ANTHROPIC_API_URL, MockResponse::Stream(vec![]));
        let http = Arc::new(http);

        let provider = AnthropicProvider::new(Arc::clone(&http) as Arc<dyn HttpClient>);
        let options = ProviderOptions {
            model: None,
            max_tokens: None,
            extended_thinking: true,
        };
        let stream = provider
            .stream(&[ChatMessage::new(MessageRole::User, "hi")], "sk-test", &options)
            .await
            .unwrap();
        collect(stream).await;

        let body: serde_json::Value =
            serde_json::from_str(http.get_requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 4096);
        assert!(body.get("thinking").is_none());
    }

    #[tokio::test]
    async fn test_error_event_is_terminal() {
        let http = MockHttpClient::new();
        http.set_response(
            ANTHROPIC_API_URL,
            MockResponse::Stream(vec![Bytes::from(
                "event: error\n\
                 data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n\
                 event: content_block_delta\n\
                 data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"late\"}}\n\n",
            )]),
        );

        let provider = AnthropicProvider::new(Arc::new(http));
        let stream = provider
            .stream(
                &[ChatMessage::new(MessageRole::User, "hi")],
                "sk-test",
                &ProviderOptions::default(),
            )
            .await
            .unwrap();

        let chunks = collect(stream).await;
        assert_eq!(chunks, vec![StreamChunk::Error("Overloaded".to_string())]);
    }

    #[tokio::test]
    async fn test_rejected_request_is_setup_error() {
        let http = MockHttpClient::new();
        http.set_response(
            ANTHROPIC_API_URL,
            MockResponse::StreamError(HttpError::ServerError {
                status: 401,
                message: "invalid x-api-key".to_string(),
            }),
        );

        let provider = AnthropicProvider::new(Arc::new(http));
        let result = provider
            .stream(
                &[ChatMessage::new(MessageRole::User, "hi")],
                "sk-bad",
                &ProviderOptions::default(),
            )
            .await;

        match result {
            Err(ProviderError::Upstream { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid x-api-key"));
            }
            other => panic!("expected setup error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_transport_fault_becomes_error_chunk() {
        let http = MockHttpClient::new();
        http.set_response(
            ANTHROPIC_API_URL,
            MockResponse::StreamThenError(
                vec![Bytes::from(
                    "event: content_block_delta\n\
                     data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"par\"}}\n\n",
                )],
                HttpError::ConnectionFailed("reset by peer".to_string()),
            ),
        );

        let provider = AnthropicProvider::new(Arc::new(http));
        let stream = provider
            .stream(
                &[ChatMessage::new(MessageRole::User, "hi")],
                "sk-test",
                &ProviderOptions::default(),
            )
            .await
            .unwrap();

        let chunks = collect(stream).await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], StreamChunk::Text("par".to_string()));
        match &chunks[1] {
            StreamChunk::Error(message) => assert!(message.contains("reset by peer")),
            other => panic!("expected error chunk, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_events_are_skipped() {
        let http = MockHttpClient::new();
        http.set_response(
            ANTHROPIC_API_URL,
            MockResponse::Stream(vec![Bytes::from(
                "event: ping\n\
                 data: {\"type\":\"ping\"}\n\n\
                 data: not json at all\n\n\
                 event: content_block_delta\n\
                 data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\n\n",
            )]),
        );

        let provider = AnthropicProvider::new(Arc::new(http));
        let stream = provider
            .stream(
                &[ChatMessage::new(MessageRole::User, "hi")],
                "sk-test",
                &ProviderOptions::default(),
            )
            .await
            .unwrap();

        let chunks = collect(stream).await;
        assert_eq!(
            chunks,
            vec![StreamChunk::Text("ok".to_string()), StreamChunk::Done]
        );
    }
}
