//! Core data model: messages, threads, providers, and request shapes.

pub mod message;
pub mod provider;
pub mod request;
pub mod text_utils;
pub mod thread;

pub use message::{Citation, CitationTimestamp, Message, MessageRole, ProviderMetadata};
pub use provider::{
    model_label, supports_extended_thinking, Provider, CLAUDE_MODELS, DEFAULT_MODEL,
    PARALLEL_CHAT_MODELS, RESEARCH_DESCRIPTION, RESEARCH_MODEL,
};
pub use request::{ChatMessage, ChatRequest};
pub use text_utils::{char_prefix, format_timestamp, truncate_text};
pub use thread::{ChatSettings, Thread};

use chrono::Utc;
use uuid::Uuid;

/// Fresh opaque identifier for threads and messages
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time as epoch milliseconds, the store's timestamp unit
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
