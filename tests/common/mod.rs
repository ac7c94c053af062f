//! Common test utilities for integration tests.
//!
//! Builders for sessions over in-memory adapters, canned provider
//! scripts, and a driver that pumps the session channel until a
//! stream settles.

use std::sync::Arc;

use bytes::Bytes;
use trunky::adapters::{MemoryStore, MockHttpClient, MockResponse};
use trunky::providers::ProviderRegistry;
use trunky::session::{ChatSession, SessionMessage};
use trunky::storage::Storage;

/// Build a session over in-memory storage and a scripted HTTP mock.
#[allow(dead_code)]
pub async fn session_over(store: &MemoryStore, mock: &MockHttpClient) -> ChatSession {
    let storage = Storage::new(Arc::new(store.clone()));
    session_with_storage(storage, mock).await
}

/// Build a session over an existing storage facade.
#[allow(dead_code)]
pub async fn session_with_storage(storage: Storage, mock: &MockHttpClient) -> ChatSession {
    let providers = Arc::new(ProviderRegistry::new(Arc::new(mock.clone())));
    ChatSession::bootstrap(storage, providers)
        .await
        .expect("bootstrap should succeed")
}

/// Receive and apply stream messages until the terminal one lands.
#[allow(dead_code)]
pub async fn drive_stream(session: &mut ChatSession) {
    let mut rx = session.message_rx.take().expect("receiver already taken");
    loop {
        let msg = rx
            .recv()
            .await
            .expect("stream task hung up without a terminal message");
        let terminal = matches!(
            msg,
            SessionMessage::StreamComplete { .. } | SessionMessage::StreamError { .. }
        );
        session.handle_message(msg).await.expect("handle_message");
        if terminal {
            break;
        }
    }
    session.message_rx = Some(rx);
}

/// Anthropic SSE script streaming `text` in a single delta.
#[allow(dead_code)]
pub fn anthropic_says(text: &str) -> MockResponse {
    MockResponse::Stream(vec![
        Bytes::from(format!(
            "event: content_block_delta\n\
             data: {{\"type\":\"content_block_delta\",\"index\":0,\"delta\":{{\"type\":\"text_delta\",\"text\":\"{}\"}}}}\n\n",
            text
        )),
        Bytes::from_static(
            b"event: message_stop\n\
              data: {\"type\":\"message_stop\"}\n\n",
        ),
    ])
}

/// Anthropic SSE script streaming "Hello" over two deltas.
#[allow(dead_code)]
pub fn anthropic_hello() -> MockResponse {
    MockResponse::Stream(vec![
        Bytes::from_static(
            b"event: content_block_start\n\
              data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        ),
        Bytes::from_static(
            b"event: content_block_delta\n\
              data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
        ),
        Bytes::from_static(
            b"event: content_block_delta\n\
              data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
        ),
        Bytes::from_static(
            b"event: message_stop\n\
              data: {\"type\":\"message_stop\"}\n\n",
        ),
    ])
}
