//! Client for the relay's `/api/chat` endpoint.
//!
//! Posts a [`ChatRequest`] and decodes the SSE response back into the
//! same [`StreamChunk`] sequence the provider adapters emit, so a
//! session can run against a relay instead of talking to providers
//! directly.

use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};

use crate::models::ChatRequest;
use crate::providers::{ChunkStream, ProviderError, StreamChunk};
use crate::sse::{decode_data, frame_stream, SseFrame};
use crate::traits::{Headers, HttpClient, HttpError};

/// HTTP client for a running relay
#[derive(Clone)]
pub struct RelayClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
}

impl RelayClient {
    /// Client for the relay at `base_url` (no trailing slash)
    pub fn new(base_url: &str, http: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    /// Send a chat request and stream the decoded chunks.
    ///
    /// Validation and setup failures from the relay (non-2xx) are
    /// returned as an error carrying the relay's JSON error message.
    /// Faults after the stream starts arrive in-band as a terminal
    /// `Error` chunk.
    pub async fn stream(&self, request: &ChatRequest) -> Result<ChunkStream, ProviderError> {
        let body = serde_json::to_string(request).map_err(|e| ProviderError::InvalidResponse {
            message: format!("Failed to encode request: {}", e),
        })?;

        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "text/event-stream".to_string());

        let bytes = self
            .http
            .post_stream(&self.chat_url(), &body, &headers)
            .await
            .map_err(ProviderError::from_setup)?;

        Ok(decode_relay_events(frame_stream(bytes)))
    }
}

struct DecodeState {
    frames: Pin<Box<dyn Stream<Item = Result<SseFrame, HttpError>> + Send>>,
    finished: bool,
}

/// Map relay SSE frames to chunks. Start markers decode to nothing,
/// malformed data lines are skipped, and the stream always ends with
/// one terminal chunk (`Done` on `[DONE]` or exhaustion, `Error` on a
/// transport fault or relayed error event).
fn decode_relay_events(
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
                Some(Ok(frame)) => match decode_data(&frame.data) {
                    Ok(Some(chunk)) => {
                        state.finished = chunk.is_terminal();
                        return Some((chunk, state));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!("Skipping malformed relay payload: {}", e);
                    }
                },
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

// ============= Relay Client Tests =============

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MockHttpClient, MockResponse};
    use crate::models::{ChatMessage, MessageRole};
    use bytes::Bytes;

    fn relay_over(mock: &MockHttpClient) -> RelayClient {
        RelayClient::new("http://127.0.0.1:3000", Arc::new(mock.clone()))
    }

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::new(MessageRole::User, "hi")])
            .with_api_key("sk-ant-xxx")
    }

    async fn collect(stream: ChunkStream) -> Vec<StreamChunk> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_stream_decodes_relay_events() {
        let mock = MockHttpClient::default();
        mock.set_response(
            "http://127.0.0.1:3000/api/chat",
            MockResponse::Stream(vec![
                Bytes::from_static(b"data: {\"textStart\":true}\n\n"),
                Bytes::from_static(b"data: {\"text\":\"Hel\"}\n\ndata: {\"text\":\"lo\"}\n\n"),
                Bytes::from_static(b"data: [DONE]\n\n"),
            ]),
        );
        let client = relay_over(&mock);

        let chunks = collect(client.stream(&request()).await.unwrap()).await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("Hel".to_string()),
                StreamChunk::Text("lo".to_string()),
                StreamChunk::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_posts_camel_case_request() {
        let mock = MockHttpClient::default();
        mock.set_response(
            "http://127.0.0.1:3000/api/chat",
            MockResponse::Stream(vec![Bytes::from_static(b"data: [DONE]\n\n")]),
        );
        let client = relay_over(&mock);

        collect(client.stream(&request()).await.unwrap()).await;

        let recorded = mock.get_requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].url, "http://127.0.0.1:3000/api/chat");
        let body: serde_json::Value =
            serde_json::from_str(recorded[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["apiKey"], "sk-ant-xxx");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_stream_trims_trailing_slash() {
        let mock = MockHttpClient::default();
        mock.set_response(
            "http://127.0.0.1:3000/api/chat",
            MockResponse::Stream(vec![Bytes::from_static(b"data: [DONE]\n\n")]),
        );
        let client = RelayClient::new("http://127.0.0.1:3000/", Arc::new(mock.clone()));

        assert!(client.stream(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_relay_error_event_is_terminal() {
        let mock = MockHttpClient::default();
        mock.set_response(
            "http://127.0.0.1:3000/api/chat",
            MockResponse::Stream(vec![
                Bytes::from_static(b"data: {\"text\":\"partial\"}\n\n"),
                Bytes::from_static(b"data: {\"error\":\"upstream fell over\"}\n\n"),
                Bytes::from_static(b"data: {\"text\":\"never seen\"}\n\n"),
            ]),
        );
        let client = relay_over(&mock);

        let chunks = collect(client.stream(&request()).await.unwrap()).await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("partial".to_string()),
                StreamChunk::Error("upstream fell over".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_validation_failure_is_setup_error() {
        let mock = MockHttpClient::default();
        mock.set_response(
            "http://127.0.0.1:3000/api/chat",
            MockResponse::Error(HttpError::ServerError {
                status: 400,
                message: "API key is required".to_string(),
            }),
        );
        let client = relay_over(&mock);

        let err = client
            .stream(&request())
            .await
            .err()
            .expect("expected stream to fail");

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("API key is required"));
    }

    #[tokio::test]
    async fn test_transport_drop_mid_stream_yields_error_chunk() {
        let mock = MockHttpClient::default();
        mock.set_response(
            "http://127.0.0.1:3000/api/chat",
            MockResponse::StreamThenError(
                vec![Bytes::from_static(b"data: {\"text\":\"Hel\"}\n\n")],
                HttpError::ConnectionFailed("connection reset".to_string()),
            ),
        );
        let client = relay_over(&mock);

        let chunks = collect(client.stream(&request()).await.unwrap()).await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], StreamChunk::Text("Hel".to_string()));
        assert!(matches!(&chunks[1], StreamChunk::Error(msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_malformed_data_lines_are_skipped() {
        let mock = MockHttpClient::default();
        mock.set_response(
            "http://127.0.0.1:3000/api/chat",
            MockResponse::Stream(vec![
                Bytes::from_static(b"data: not json\n\n"),
                Bytes::from_static(b"data: {\"unknown\":1}\n\n"),
                Bytes::from_static(b"data: {\"text\":\"ok\"}\n\n"),
                Bytes::from_static(b"data: [DONE]\n\n"),
            ]),
        );
        let client = relay_over(&mock);

        let chunks = collect(client.stream(&request()).await.unwrap()).await;

        assert_eq!(
            chunks,
            vec![StreamChunk::Text("ok".to_string()), StreamChunk::Done]
        );
    }
}
