use serde::{Deserialize, Serialize};

use super::provider::Provider;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A source citation attached to an assistant message.
///
/// Upstream payloads vary, so every field is lenient: missing fields
/// deserialize to their defaults instead of failing the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Citation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<CitationTimestamp>,
}

/// Citation timestamp as upstream sent it: the browser store wrote
/// epoch milliseconds, other payloads carry preformatted date strings.
/// Either form round-trips unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CitationTimestamp {
    Millis(i64),
    Text(String),
}

/// Provider-specific details carried on assistant messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Which provider produced the message
    pub provider: Provider,
    /// Citations accumulated during streaming (append-only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// Long-running task identifier (deep research)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Last reported task progress, 0-100 (overwritten, not accumulated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Last reported task status string (overwritten, not accumulated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProviderMetadata {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            citations: Vec::new(),
            task_id: None,
            progress: None,
            status: None,
        }
    }
}

/// A single message within a thread.
///
/// Serializes as the camelCase JSON the browser client wrote, so an
/// existing persisted store loads unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID (opaque string)
    pub id: String,
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message; append-only while streaming
    pub content: String,
    /// When the message was created (epoch milliseconds)
    pub timestamp: i64,
    /// ID of the thread this message belongs to
    pub thread_id: String,
    /// Reasoning transcript streamed alongside the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// True only on messages copied into a child thread at branch creation
    #[serde(default)]
    pub is_inherited: bool,
    /// Which provider produced the message (assistant messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    /// Provider-specific details (assistant messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ProviderMetadata>,
    /// Whether the message is an in-flight streaming snapshot.
    /// Never serialized: persisted messages are always settled.
    #[serde(default, skip_serializing)]
    pub is_streaming: bool,
}

impl Message {
    /// Create a user message for the given thread
    pub fn user(thread_id: &str, content: &str) -> Self {
        Self {
            id: super::new_id(),
            role: MessageRole::User,
            content: content.to_string(),
            timestamp: super::now_millis(),
            thread_id: thread_id.to_string(),
            thinking: None,
            is_inherited: false,
            provider: None,
            metadata: None,
            is_streaming: false,
        }
    }

    /// Create an empty assistant message to accumulate a stream into
    pub fn assistant(thread_id: &str, provider: Provider) -> Self {
        Self {
            id: super::new_id(),
            role: MessageRole::Assistant,
            content: String::new(),
            timestamp: super::now_millis(),
            thread_id: thread_id.to_string(),
            thinking: None,
            is_inherited: false,
            provider: Some(provider),
            metadata: Some(ProviderMetadata::new(provider)),
            is_streaming: true,
        }
    }

    /// Append a text delta during streaming
    pub fn append_text(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    /// Append a thinking delta during streaming
    pub fn append_thinking(&mut self, delta: &str) {
        self.thinking.get_or_insert_with(String::new).push_str(delta);
    }

    /// Add a batch of citations (batches accumulate in order)
    pub fn add_citations(&mut self, citations: &[Citation]) {
        let provider = self.provider.unwrap_or_default();
        self.metadata
            .get_or_insert_with(|| ProviderMetadata::new(provider))
            .citations
            .extend_from_slice(citations);
    }

    /// Overwrite task progress details with the latest report
    pub fn set_progress(&mut self, task_id: &str, progress: u8, status: &str) {
        let provider = self.provider.unwrap_or_default();
        let metadata = self
            .metadata
            .get_or_insert_with(|| ProviderMetadata::new(provider));
        metadata.task_id = Some(task_id.to_string());
        metadata.progress = Some(progress);
        metadata.status = Some(status.to_string());
    }

    /// Mark the message as settled (no longer streaming)
    pub fn finalize(&mut self) {
        self.is_streaming = false;
    }

    /// Structural copy for a child thread: same id, content, and
    /// timestamp, re-tagged as inherited.
    pub fn inherited_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.is_inherited = true;
        copy.is_streaming = false;
        copy
    }
}
