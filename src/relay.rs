//! SSE relay server.
//!
//! Exposes the provider adapters over HTTP for browser clients:
//! `POST /api/chat` validates the request, starts the provider stream,
//! and frames every chunk as a server-sent event. Validation and setup
//! failures come back as JSON errors with a meaningful status; once
//! streaming starts, faults arrive in-band as `error` events.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use futures::{future, StreamExt};
use serde_json::json;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

use crate::models::ChatRequest;
use crate::providers::{ChunkStream, ProviderOptions, ProviderRegistry};
use crate::sse::WireEncoder;

/// Address the relay binds when none is configured
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:3000";

/// Shared state for the relay handlers
#[derive(Clone)]
pub struct RelayState {
    /// Adapters for every supported provider
    pub registry: Arc<ProviderRegistry>,
}

/// Start the relay on the default address.
///
/// Returns the server task handle and the bound address.
pub async fn start_relay(
    registry: Arc<ProviderRegistry>,
) -> color_eyre::Result<(JoinHandle<()>, SocketAddr)> {
    start_relay_on(DEFAULT_RELAY_ADDR.parse()?, registry).await
}

/// Start the relay on a specific address.
///
/// This is useful for tests that need to bind to a random port.
pub async fn start_relay_on(
    addr: SocketAddr,
    registry: Arc<ProviderRegistry>,
) -> color_eyre::Result<(JoinHandle<()>, SocketAddr)> {
    let state = RelayState { registry };

    // Browser clients call from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Relay listening on http://{}", actual_addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Relay server error: {}", e);
        }
    });

    Ok((handle, actual_addr))
}

/// Handler for the chat endpoint.
///
/// The credential is checked before the message list, matching what
/// existing clients expect when both are missing.
async fn chat_handler(
    State(state): State<RelayState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let provider = request.provider();
    let Some(api_key) = request.credential().map(str::to_string) else {
        return error_response(StatusCode::BAD_REQUEST, "API key is required");
    };
    if request.messages.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Messages array is required");
    }

    let options = ProviderOptions {
        model: request.model.clone(),
        max_tokens: request.max_tokens,
        extended_thinking: request.extended_thinking,
    };

    let adapter = state.registry.get(provider);
    match adapter.stream(&request.messages, &api_key, &options).await {
        Ok(chunks) => sse_response(chunks),
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "Failed to start chat stream");
            let status = e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, &e.message())
        }
    }
}

/// Handler for the liveness probe
async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Frame a chunk stream as an SSE body
fn sse_response(chunks: ChunkStream) -> Response {
    let frames = chunks
        .scan(WireEncoder::new(), |encoder, chunk| {
            future::ready(Some(encoder.encode(&chunk)))
        })
        .map(|frame| Ok::<_, Infallible>(Bytes::from(frame)));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Body::from_stream(frames),
    )
        .into_response()
}

// ============= Relay Handler Tests =============
