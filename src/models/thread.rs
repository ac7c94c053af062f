use serde::{Deserialize, Serialize};

use super::message::Message;
use super::provider::{Provider, DEFAULT_MODEL};
use super::text_utils::truncate_text;

/// Thread titles are cut to this many characters for display
const MAX_TITLE_LEN: usize = 50;

/// Per-thread provider and model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSettings {
    /// Model id sent to the provider
    pub model: String,
    /// Response token cap
    pub max_tokens: u32,
    /// Request a reasoning transcript where the model supports it
    pub extended_thinking: bool,
    /// Provider override; None means Anthropic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            extended_thinking: false,
            provider: None,
        }
    }
}

impl ChatSettings {
    /// Provider this thread talks to
    pub fn provider(&self) -> Provider {
        self.provider.unwrap_or_default()
    }
}

/// A conversation thread.
///
/// Root threads have no parent pointers. A child thread starts with an
/// inherited prefix copied from its parent at branch time, followed by
/// messages native to the thread. Threads are never deleted, only
/// removed from the active set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Unique thread ID (opaque string)
    pub id: String,
    /// Parent thread, None for roots
    pub parent_thread_id: Option<String>,
    /// Message in the parent this thread branched from
    pub parent_message_id: Option<String>,
    /// Text selected in the branch-point message when the thread was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    /// Messages in order: inherited prefix, then native suffix
    #[serde(default)]
    pub messages: Vec<Message>,
    /// When the thread was created (epoch milliseconds)
    pub created_at: i64,
    /// Per-thread provider settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ChatSettings>,
}

impl Thread {
    /// Create an empty root thread
    pub fn root() -> Self {
        Self {
            id: super::new_id(),
            parent_thread_id: None,
            parent_message_id: None,
            selected_text: None,
            messages: Vec::new(),
            created_at: super::now_millis(),
            settings: None,
        }
    }

    /// Branch a child off `parent` at `parent_message_id`.
    ///
    /// The child inherits structural copies of the parent's messages up
    /// to and including the branch point. An unknown branch point
    /// inherits the entire parent list (fail-open, kept for
    /// compatibility with existing stores).
    pub fn branch_from(
        parent: &Thread,
        parent_message_id: &str,
        selected_text: Option<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            parent_thread_id: Some(parent.id.clone()),
            parent_message_id: Some(parent_message_id.to_string()),
            selected_text,
            messages: parent.messages_up_to(parent_message_id),
            created_at: super::now_millis(),
            settings: parent.settings.clone(),
        }
    }

    /// True for conversation roots
    pub fn is_root(&self) -> bool {
        self.parent_thread_id.is_none()
    }

    /// Inherited copies of the messages up to and including
    /// `message_id`; the whole list if the id is not found.
    pub fn messages_up_to(&self, message_id: &str) -> Vec<Message> {
        let cut = self.messages.iter().position(|m| m.id == message_id);
        let prefix = match cut {
            Some(index) => &self.messages[..=index],
            None => &self.messages[..],
        };
        prefix.iter().map(Message::inherited_copy).collect()
    }

    /// First user message, if any
    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.role == super::message::MessageRole::User)
    }

    /// Display title: the branch selection, else the first user
    /// message, else a placeholder.
    pub fn title(&self) -> String {
        if let Some(selected) = &self.selected_text {
            if !selected.trim().is_empty() {
                return truncate_text(selected, MAX_TITLE_LEN);
            }
        }
        if let Some(first) = self.first_user_message() {
            if !first.content.trim().is_empty() {
                return truncate_text(&first.content, MAX_TITLE_LEN);
            }
        }
        "New Thread".to_string()
    }

    /// Settings, falling back to the defaults
    pub fn settings_or_default(&self) -> ChatSettings {
        self.settings.clone().unwrap_or_default()
    }
}
