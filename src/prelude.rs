//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types from the trunky library,
//! providing a convenient way to import the most frequently used items.
//!
//! # Usage
//!
//! ```ignore
//! use trunky::prelude::*;
//! ```
//!
//! This will import:
//! - Session types (ChatSession, SessionMessage, PendingSelection)
//! - Model types (Thread, Message, MessageRole, Provider, ChatSettings)
//! - Store types (ConversationState, ConversationSummary)
//! - Streaming types (ProviderRegistry, StreamChunk, StreamingReconciler)
//! - Relay types (start_relay, RelayClient)

// Session types
pub use crate::session::{ChatSession, PendingSelection, SessionMessage};

// Model types
pub use crate::models::{
    ChatMessage, ChatRequest, ChatSettings, Citation, CitationTimestamp, Message, MessageRole,
    Provider, ProviderMetadata, Thread,
};

// Store types
pub use crate::store::{ConversationState, ConversationSummary};

// Streaming types
pub use crate::providers::{ChunkStream, ProviderOptions, ProviderRegistry, StreamChunk};
pub use crate::reconciler::{ReconcilerUpdate, StreamingReconciler};

// Relay types
pub use crate::client::RelayClient;
pub use crate::relay::{start_relay, start_relay_on, DEFAULT_RELAY_ADDR};

// Persistence
pub use crate::storage::Storage;
