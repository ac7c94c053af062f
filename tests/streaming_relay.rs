//! End-to-end relay tests over real HTTP.
//!
//! The relay binds an ephemeral port with scripted upstreams behind
//! it; a RelayClient on a real reqwest client consumes the stream.
//! This exercises the whole chain: request encoding, axum routing,
//! wire framing, and client-side decoding.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use trunky::adapters::{MockHttpClient, MockResponse, ReqwestHttpClient};
use trunky::client::RelayClient;
use trunky::models::{ChatMessage, ChatRequest, MessageRole, Provider};
use trunky::providers::{ProviderRegistry, StreamChunk, ANTHROPIC_API_URL};
use trunky::relay::start_relay_on;
use trunky::traits::{Headers, HttpClient, HttpError};

/// Start a relay on an ephemeral port over the given upstream mock.
async fn relay_over(mock: &MockHttpClient) -> (String, RelayClient) {
    let registry = Arc::new(ProviderRegistry::new(Arc::new(mock.clone())));
    let (_handle, addr) = start_relay_on("127.0.0.1:0".parse().unwrap(), registry)
        .await
        .expect("relay should bind an ephemeral port");
    let base_url = format!("http://{}", addr);
    let client = RelayClient::new(&base_url, Arc::new(ReqwestHttpClient::new()));
    (base_url, client)
}

fn hello_request() -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::new(MessageRole::User, "hi")])
        .with_api_key("sk-ant-test")
}

#[tokio::test]
async fn test_relay_round_trip_streams_tokens() {
    let mock = MockHttpClient::default();
    mock.set_response(ANTHROPIC_API_URL, common::anthropic_hello());
    let (_base, client) = relay_over(&mock).await;

    let chunks: Vec<StreamChunk> = client
        .stream(&hello_request())
        .await
        .expect("stream should open")
        .collect()
        .await;

    assert_eq!(
        chunks,
        vec![
            StreamChunk::Text("Hel".to_string()),
            StreamChunk::Text("lo".to_string()),
            StreamChunk::Done,
        ]
    );

    // The upstream request carried the forwarded credential.
    let requests = mock.get_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, ANTHROPIC_API_URL);
    assert_eq!(
        requests[0].headers.get("x-api-key").map(String::as_str),
        Some("sk-ant-test")
    );
}

#[tokio::test]
async fn test_relay_rejects_request_without_credential() {
    let mock = MockHttpClient::default();
    let (_base, client) = relay_over(&mock).await;
    let request = ChatRequest::new(vec![ChatMessage::new(MessageRole::User, "hi")]);

    let err = client
        .stream(&request)
        .await
        .err()
        .expect("expected stream to fail");

    assert_eq!(err.status(), Some(400));
    assert!(err.message().contains("API key is required"));
    assert!(mock.get_requests().is_empty(), "nothing reached the upstream");
}

#[tokio::test]
async fn test_relay_rejects_empty_messages() {
    let mock = MockHttpClient::default();
    let (_base, client) = relay_over(&mock).await;
    let request = ChatRequest::new(vec![]).with_api_key("sk-ant-test");

    let err = client
        .stream(&request)
        .await
        .err()
        .expect("expected stream to fail");

    assert_eq!(err.status(), Some(400));
    assert!(err.message().contains("Messages array is required"));
}

#[tokio::test]
async fn test_relay_passes_upstream_rejection_through() {
    let mock = MockHttpClient::default();
    mock.set_response(
        ANTHROPIC_API_URL,
        MockResponse::Error(HttpError::ServerError {
            status: 401,
            message: "invalid x-api-key".to_string(),
        }),
    );
    let (_base, client) = relay_over(&mock).await;

    let err = client
        .stream(&hello_request())
        .await
        .err()
        .expect("expected stream to fail");

    assert_eq!(err.status(), Some(401), "upstream status survives the hop");
    assert!(err.message().contains("invalid x-api-key"));
}

#[tokio::test]
async fn test_relay_reports_mid_stream_failure_as_error_event() {
    let mock = MockHttpClient::default();
    mock.set_response(
        ANTHROPIC_API_URL,
        MockResponse::StreamThenError(
            vec![Bytes::from_static(
                b"event: content_block_delta\n\
                  data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
            )],
            HttpError::Io("connection reset".to_string()),
        ),
    );
    let (_base, client) = relay_over(&mock).await;

    let chunks: Vec<StreamChunk> = client
        .stream(&hello_request())
        .await
        .expect("setup succeeds, failure arrives in-stream")
        .collect()
        .await;

    assert_eq!(chunks[0], StreamChunk::Text("Hel".to_string()));
    match chunks.last().unwrap() {
        StreamChunk::Error(message) => assert!(message.contains("connection reset")),
        other => panic!("expected an error chunk, got {:?}", other),
    }
    assert!(
        !chunks.contains(&StreamChunk::Done),
        "a failed stream never reports completion"
    );
}

#[tokio::test]
async fn test_relay_routes_by_requested_provider() {
    let mock = MockHttpClient::default();
    mock.set_response(
        trunky::providers::PARALLEL_CHAT_URL,
        MockResponse::Stream(vec![
            Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"From Parallel\"}}]}\n\n",
            ),
            Bytes::from_static(b"data: [DONE]\n\n"),
        ]),
    );
    let (_base, client) = relay_over(&mock).await;
    let request = ChatRequest::new(vec![ChatMessage::new(MessageRole::User, "hi")])
        .with_provider(Provider::ParallelChat)
        .with_parallel_api_key("pk-test");

    let chunks: Vec<StreamChunk> = client
        .stream(&request)
        .await
        .expect("stream should open")
        .collect()
        .await;

    assert_eq!(chunks[0], StreamChunk::Text("From Parallel".to_string()));
    assert_eq!(*chunks.last().unwrap(), StreamChunk::Done);
    assert_eq!(mock.get_requests()[0].url, trunky::providers::PARALLEL_CHAT_URL);
}

#[tokio::test]
async fn test_relay_health_endpoint() {
    let mock = MockHttpClient::default();
    let (base_url, _client) = relay_over(&mock).await;

    let http = ReqwestHttpClient::new();
    let response = http
        .get(&format!("{}/health", base_url), &Headers::new())
        .await
        .expect("health endpoint reachable");

    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["status"], "ok");
}
