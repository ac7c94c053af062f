//! Sending messages and driving provider streams.
//!
//! [`ChatSession::send_message`] appends and persists the user message
//! first, then spawns a task that owns the provider stream and a
//! [`StreamingReconciler`]. The task reports every reconciler update
//! over the session channel and always ends with a terminal message.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::models::{ChatMessage, ChatSettings, Message, Provider};
use crate::providers::{ProviderOptions, ProviderRegistry, StreamChunk};
use crate::reconciler::{ReconcilerUpdate, StreamingReconciler};

use super::{ChatSession, SessionMessage};

impl ChatSession {
    /// Send `content` on the current thread.
    ///
    /// The user message lands in the store and on disk before the
    /// provider is involved, so it survives a missing credential or a
    /// dead upstream. One stream per thread at a time.
    pub async fn send_message(&mut self, content: &str) -> Result<(), ChatError> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let thread_id = self.state.current_thread_id.clone();
        if self.is_streaming(&thread_id) {
            return Err(ChatError::StreamInFlight { thread_id });
        }

        self.state
            .push_message(&thread_id, Message::user(&thread_id, trimmed))?;
        self.persist().await?;

        let settings = self.resolve_settings(&thread_id);
        let provider = settings.provider();
        let Some(api_key) = self.credential_for(provider) else {
            return Err(ChatError::MissingApiKey { provider });
        };

        let messages: Vec<ChatMessage> = self
            .state
            .thread(&thread_id)
            .map(|thread| {
                thread
                    .messages
                    .iter()
                    .map(|m| ChatMessage::new(m.role, &m.content))
                    .collect()
            })
            .unwrap_or_default();
        let options = ProviderOptions {
            model: Some(settings.model.clone()),
            max_tokens: Some(settings.max_tokens),
            extended_thinking: settings.extended_thinking,
        };
        let reconciler = StreamingReconciler::new(Message::assistant(&thread_id, provider));

        self.loading.insert(thread_id.clone());
        let providers = Arc::clone(&self.providers);
        let message_tx = self.message_tx.clone();
        tokio::spawn(async move {
            process_stream(
                providers, provider, messages, api_key, options, reconciler, thread_id, message_tx,
            )
            .await;
        });

        Ok(())
    }

    /// Thread settings, falling back to the session's last choices
    fn resolve_settings(&self, thread_id: &str) -> ChatSettings {
        self.state
            .thread(thread_id)
            .and_then(|thread| thread.settings.clone())
            .unwrap_or_else(|| ChatSettings {
                model: self.last_model.clone(),
                provider: Some(self.last_provider),
                ..ChatSettings::default()
            })
    }

    /// The stored key for a provider, treating blanks as absent
    fn credential_for(&self, provider: Provider) -> Option<String> {
        let key = if provider.uses_parallel_key() {
            self.parallel_api_key.as_deref()
        } else {
            self.api_key.as_deref()
        };
        key.map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }
}

/// Drive one provider stream to its terminal chunk, reporting every
/// reconciler update over the channel.
#[allow(clippy::too_many_arguments)]
async fn process_stream(
    providers: Arc<ProviderRegistry>,
    provider: Provider,
    messages: Vec<ChatMessage>,
    api_key: String,
    options: ProviderOptions,
    mut reconciler: StreamingReconciler,
    thread_id: String,
    message_tx: mpsc::UnboundedSender<SessionMessage>,
) {
    let mut chunks = match providers
        .get(provider)
        .stream(&messages, &api_key, &options)
        .await
    {
        Ok(chunks) => chunks,
        Err(e) => {
            let _ = message_tx.send(SessionMessage::StreamError {
                thread_id,
                error: e.message(),
                partial: None,
            });
            return;
        }
    };

    while let Some(chunk) = chunks.next().await {
        match reconciler.apply(chunk) {
            ReconcilerUpdate::Snapshot(message) => {
                let _ = message_tx.send(SessionMessage::MessageSnapshot {
                    thread_id: thread_id.clone(),
                    message,
                });
            }
            ReconcilerUpdate::Complete(message) => {
                let _ = message_tx.send(SessionMessage::StreamComplete { thread_id, message });
                return;
            }
            ReconcilerUpdate::Failed { error, partial } => {
                let _ = message_tx.send(SessionMessage::StreamError {
                    thread_id,
                    error,
                    partial,
                });
                return;
            }
        }
    }

    // Adapters end their streams with a terminal chunk; a bare end
    // still settles the message.
    if let ReconcilerUpdate::Complete(message) = reconciler.apply(StreamChunk::Done) {
        let _ = message_tx.send(SessionMessage::StreamComplete { thread_id, message });
    }
}

// ============= Stream Tests =============
