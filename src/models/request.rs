use serde::{Deserialize, Serialize};

use super::message::{Message, MessageRole};
use super::provider::Provider;

/// Wire shape of one conversation turn sent to a provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
        }
    }

    /// Join turns into a single research prompt, one paragraph per turn
    pub fn join_as_prompt(messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                };
                format!("{}: {}", role, m.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Body of a relay chat call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Full conversation so far, oldest first
    pub messages: Vec<ChatMessage>,
    /// Anthropic credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Parallel credential (chat and research providers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_api_key: Option<String>,
    /// Model id; the relay substitutes the default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Response token cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Ask for a reasoning transcript
    #[serde(default)]
    pub extended_thinking: bool,
    /// Target provider; absent means Anthropic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
}

impl ChatRequest {
    /// Create a request with just the conversation
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            api_key: None,
            parallel_api_key: None,
            model: None,
            max_tokens: None,
            extended_thinking: false,
            provider: None,
        }
    }

    /// Set the Anthropic credential (builder pattern)
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Set the Parallel credential (builder pattern)
    pub fn with_parallel_api_key(mut self, key: &str) -> Self {
        self.parallel_api_key = Some(key.to_string());
        self
    }

    /// Set the model id (builder pattern)
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Set the token cap (builder pattern)
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Request extended thinking (builder pattern)
    pub fn with_extended_thinking(mut self, enabled: bool) -> Self {
        self.extended_thinking = enabled;
        self
    }

    /// Set the target provider (builder pattern)
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Provider this request targets
    pub fn provider(&self) -> Provider {
        self.provider.unwrap_or_default()
    }

    /// Credential for the targeted provider, if one was supplied
    pub fn credential(&self) -> Option<&str> {
        let key = if self.provider().uses_parallel_key() {
            self.parallel_api_key.as_deref()
        } else {
            self.api_key.as_deref()
        };
        key.filter(|k| !k.trim().is_empty())
    }
}
