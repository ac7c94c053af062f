//! Provider adapters for upstream chat APIs.
//!
//! Each adapter speaks one upstream protocol (Anthropic messages,
//! Parallel chat completions, Parallel task runs) and normalizes it
//! into a stream of [`StreamChunk`] values. Failures before the first
//! chunk surface as [`ProviderError`]; once a stream is live, faults
//! arrive in-band as `StreamChunk::Error` so partial output is never
//! lost.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ChatMessage, Citation, Provider};
use crate::traits::{HttpClient, HttpError};

pub mod anthropic;
pub mod parallel_chat;
pub mod parallel_research;

pub use anthropic::{AnthropicProvider, ANTHROPIC_API_URL, ANTHROPIC_VERSION};
pub use parallel_chat::{ParallelChatProvider, PARALLEL_CHAT_URL};
pub use parallel_research::{ParallelResearchProvider, PARALLEL_TASKS_URL};

/// Progress report for a long-running research task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskProgress {
    pub task_id: String,
    /// Percent complete, 0 to 100
    pub progress: u8,
    pub status: String,
}

/// One normalized unit of streamed provider output
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Append to the visible response. An empty delta marks the start
    /// of text output without contributing content.
    Text(String),
    /// Append to the reasoning trace. Empty deltas mark the start.
    Thinking(String),
    /// Sources to attach to the response
    Citations(Vec<Citation>),
    /// Research task progress
    Progress(TaskProgress),
    /// Terminal failure; nothing follows
    Error(String),
    /// Successful end of stream
    Done,
}

impl StreamChunk {
    /// Whether this chunk ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamChunk::Error(_) | StreamChunk::Done)
    }
}

/// Stream of normalized chunks from a provider.
///
/// Infallible at the item level: post-setup failures travel in-band
/// as `StreamChunk::Error`.
pub type ChunkStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// Per-request generation settings passed through to an adapter
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    /// Model override; each adapter falls back to its own default
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub extended_thinking: bool,
}

/// Failure to establish a provider stream.
///
/// Only covers setup: request construction, connection, and the
/// initial status check. Mid-stream faults are in-band chunks.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid provider response: {message}")]
    InvalidResponse { message: String },
}

impl ProviderError {
    /// Classify a setup-time transport failure. Rejected requests keep
    /// their upstream status so callers can pass it through.
    pub fn from_setup(err: HttpError) -> Self {
        match err {
            HttpError::ServerError { status, message } => {
                ProviderError::Upstream { status, message }
            }
            other => ProviderError::Http(other),
        }
    }

    /// Upstream status code, when the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The failure text without the variant prefix, for error bodies
    pub fn message(&self) -> String {
        match self {
            ProviderError::Http(e) => e.to_string(),
            ProviderError::Upstream { message, .. } => message.clone(),
            ProviderError::InvalidResponse { message } => message.clone(),
        }
    }
}

/// A streaming chat backend.
///
/// `stream` returns `Err` only when the stream could not be
/// established; after that every fault is a `StreamChunk::Error` item.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Which provider this adapter speaks for
    fn provider(&self) -> Provider;

    /// Open a streaming completion for the given conversation
    async fn stream(
        &self,
        messages: &[ChatMessage],
        api_key: &str,
        options: &ProviderOptions,
    ) -> Result<ChunkStream, ProviderError>;
}

/// All provider adapters over one shared HTTP client
pub struct ProviderRegistry {
    anthropic: AnthropicProvider,
    parallel_chat: ParallelChatProvider,
    parallel_research: ParallelResearchProvider,
}

impl ProviderRegistry {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            anthropic: AnthropicProvider::new(Arc::clone(&http)),
            parallel_chat: ParallelChatProvider::new(Arc::clone(&http)),
            parallel_research: ParallelResearchProvider::new(http),
        }
    }

    /// Look up the adapter for a provider
    pub fn get(&self, provider: Provider) -> &dyn ChatProvider {
        match provider {
            Provider::Anthropic => &self.anthropic,
            Provider::ParallelChat => &self.parallel_chat,
            Provider::ParallelResearch => &self.parallel_research,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockHttpClient;

    #[test]
    fn test_task_progress_serializes_camel_case() {
        let progress = TaskProgress {
            task_id: "t-1".to_string(),
            progress: 55,
            status: "running".to_string(),
        };
        let json = serde_json::to_string(&progress).unwrap();
        assert_eq!(json, r#"{"taskId":"t-1","progress":55,"status":"running"}"#);

        let back: TaskProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, progress);
    }

    #[test]
    fn test_terminal_chunks() {
        assert!(StreamChunk::Done.is_terminal());
        assert!(StreamChunk::Error("x".to_string()).is_terminal());
        assert!(!StreamChunk::Text("x".to_string()).is_terminal());
        assert!(!StreamChunk::Progress(TaskProgress {
            task_id: "t".to_string(),
            progress: 0,
            status: "pending".to_string(),
        })
        .is_terminal());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Upstream {
            status: 529,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream error (529): overloaded");

        let err = ProviderError::InvalidResponse {
            message: "missing task id".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid provider response: missing task id");
    }

    #[test]
    fn test_registry_routes_by_provider() {
        let registry = ProviderRegistry::new(Arc::new(MockHttpClient::new()));
        assert_eq!(registry.get(Provider::Anthropic).provider(), Provider::Anthropic);
        assert_eq!(
            registry.get(Provider::ParallelChat).provider(),
            Provider::ParallelChat
        );
        assert_eq!(
            registry.get(Provider::ParallelResearch).provider(),
            Provider::ParallelResearch
        );
    }
}
