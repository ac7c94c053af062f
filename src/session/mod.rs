//! Session controller.
//!
//! Owns the [`ConversationState`] and turns user actions into store
//! mutations, provider streams, and write-through persists. Streaming
//! happens in spawned tasks that report back over an unbounded
//! channel; the owner applies those updates through
//! [`ChatSession::handle_message`], so all state changes stay on one
//! task.

pub mod stream;

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::models::{ChatSettings, Message, Provider};
use crate::providers::ProviderRegistry;
use crate::storage::Storage;
use crate::store::ConversationState;

/// A text selection held until the user confirms branch creation.
/// Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSelection {
    /// Selected substring of the message content
    pub text: String,
    /// Message the selection was made in
    pub message_id: String,
    /// Thread owning that message
    pub thread_id: String,
}

/// Messages from spawned stream tasks back to the session owner
#[derive(Debug, Clone)]
pub enum SessionMessage {
    /// Intermediate streaming snapshot of the assistant message
    MessageSnapshot { thread_id: String, message: Message },
    /// Final snapshot; the stream finished cleanly
    StreamComplete { thread_id: String, message: Message },
    /// The stream failed; `partial` holds whatever accumulated
    StreamError {
        thread_id: String,
        error: String,
        partial: Option<Message>,
    },
}

/// Controller for one user's conversations
pub struct ChatSession {
    state: ConversationState,
    storage: Storage,
    providers: Arc<ProviderRegistry>,
    api_key: Option<String>,
    parallel_api_key: Option<String>,
    last_model: String,
    last_provider: Provider,
    /// Threads with a stream in flight. Set before the first chunk
    /// lands, cleared by the terminal message.
    loading: HashSet<String>,
    pending_selection: Option<PendingSelection>,
    last_error: Option<String>,
    message_tx: mpsc::UnboundedSender<SessionMessage>,
    /// Receiver for the driver loop; take() it once
    pub message_rx: Option<mpsc::UnboundedReceiver<SessionMessage>>,
}

impl ChatSession {
    /// Load persisted state and preferences, creating and persisting a
    /// fresh conversation on first run.
    pub async fn bootstrap(
        storage: Storage,
        providers: Arc<ProviderRegistry>,
    ) -> Result<Self, ChatError> {
        let state = match storage.load_conversations().await? {
            Some(state) => state,
            None => {
                let state = ConversationState::new();
                storage.save_conversations(&state).await?;
                state
            }
        };
        let api_key = storage.load_api_key().await?;
        let parallel_api_key = storage.load_parallel_api_key().await?;
        let last_model = storage.load_last_model().await?;
        let last_provider = storage.load_last_provider().await?;

        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Ok(Self {
            state,
            storage,
            providers,
            api_key,
            parallel_api_key,
            last_model,
            last_provider,
            loading: HashSet::new(),
            pending_selection: None,
            last_error: None,
            message_tx,
            message_rx: Some(message_rx),
        })
    }

    /// Current conversation state
    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Last stream failure, until cleared
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Whether `thread_id` has a response stream in flight
    pub fn is_streaming(&self, thread_id: &str) -> bool {
        self.loading.contains(thread_id) || self.state.is_thread_streaming(thread_id)
    }

    /// Apply one message from a stream task.
    ///
    /// Intermediate snapshots update the state without persisting.
    /// Terminal messages clear the loading gate and persist; a failure
    /// keeps whatever partial content accumulated.
    pub async fn handle_message(&mut self, message: SessionMessage) -> Result<(), ChatError> {
        match message {
            SessionMessage::MessageSnapshot { thread_id, message } => {
                if let Err(e) = self.state.upsert_message(&thread_id, message) {
                    tracing::warn!(thread_id = %thread_id, error = %e, "Dropping snapshot for unknown thread");
                }
                Ok(())
            }
            SessionMessage::StreamComplete { thread_id, message } => {
                self.loading.remove(&thread_id);
                self.state.upsert_message(&thread_id, message)?;
                self.persist().await
            }
            SessionMessage::StreamError {
                thread_id,
                error,
                partial,
            } => {
                self.loading.remove(&thread_id);
                tracing::warn!(thread_id = %thread_id, error = %error, "Stream failed");
                self.last_error = Some(error);
                if let Some(partial) = partial {
                    self.state.upsert_message(&thread_id, partial)?;
                    self.persist().await?;
                }
                Ok(())
            }
        }
    }

    /// Record a text selection for a later branch confirmation.
    ///
    /// The selection must name an existing message and be a literal
    /// substring of its content.
    pub fn select_text(
        &mut self,
        thread_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), ChatError> {
        let thread = self
            .state
            .thread(thread_id)
            .ok_or_else(|| ChatError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;
        let message = thread
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| ChatError::SelectionNotFound {
                message_id: message_id.to_string(),
            })?;
        if !message.content.contains(text) {
            return Err(ChatError::SelectionMismatch {
                message_id: message_id.to_string(),
            });
        }

        self.pending_selection = Some(PendingSelection {
            text: text.to_string(),
            message_id: message_id.to_string(),
            thread_id: thread_id.to_string(),
        });
        Ok(())
    }

    /// The selection waiting for confirmation, if any
    pub fn pending_selection(&self) -> Option<&PendingSelection> {
        self.pending_selection.as_ref()
    }

    /// Drop the held selection without branching
    pub fn clear_selection(&mut self) {
        self.pending_selection = None;
    }

    /// Create the child thread for the held selection and clear it.
    ///
    /// Confirming with nothing pending is a no-op, matching the
    /// two-step select-then-confirm UI.
    pub async fn confirm_branch(&mut self) -> Result<Option<String>, ChatError> {
        let Some(selection) = self.pending_selection.take() else {
            return Ok(None);
        };

        let child_id = self.state.create_child_thread(
            &selection.thread_id,
            &selection.message_id,
            Some(selection.text),
        )?;
        self.persist().await?;
        Ok(Some(child_id))
    }

    /// Navigate and persist; false leaves everything untouched
    pub async fn navigate_to(&mut self, thread_id: &str) -> Result<bool, ChatError> {
        if !self.state.navigate_to(thread_id) {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    /// Close a thread and persist; false leaves everything untouched
    pub async fn close_thread(&mut self, thread_id: &str) -> Result<bool, ChatError> {
        if !self.state.close_thread(thread_id) {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    /// Start and persist a fresh conversation tree
    pub async fn new_conversation(&mut self) -> Result<String, ChatError> {
        let root_id = self.state.start_new_conversation();
        self.persist().await?;
        Ok(root_id)
    }

    /// Replace a thread's settings; the choice also becomes the
    /// session default for threads without their own.
    pub async fn update_settings(
        &mut self,
        thread_id: &str,
        settings: ChatSettings,
    ) -> Result<(), ChatError> {
        let mut thread = self
            .state
            .thread(thread_id)
            .cloned()
            .ok_or_else(|| ChatError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;
        thread.settings = Some(settings.clone());
        self.state.update_thread(thread);

        self.last_model = settings.model.clone();
        self.last_provider = settings.provider();
        self.storage.save_last_model(&self.last_model).await?;
        self.storage.save_last_provider(self.last_provider).await?;
        self.persist().await
    }

    pub async fn set_api_key(&mut self, api_key: &str) -> Result<(), ChatError> {
        self.api_key = Some(api_key.to_string());
        self.storage.save_api_key(api_key).await?;
        Ok(())
    }

    pub async fn set_parallel_api_key(&mut self, api_key: &str) -> Result<(), ChatError> {
        self.parallel_api_key = Some(api_key.to_string());
        self.storage.save_parallel_api_key(api_key).await?;
        Ok(())
    }

    async fn persist(&self) -> Result<(), ChatError> {
        self.storage.save_conversations(&self.state).await?;
        Ok(())
    }
}

// ============= Session Tests =============
