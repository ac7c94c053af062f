//! Error taxonomy for the chat session and its transports.

use std::fmt;

use crate::models::Provider;

/// Broad class of a [`ChatError`], used for routing and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any network activity
    Validation,
    /// Network or HTTP failure talking to a provider or the relay
    Transport,
    /// Malformed streamed payload
    Protocol,
    /// A long-running research task failed or timed out
    UpstreamTask,
    /// Persistence layer failure
    Storage,
}

/// Errors surfaced by the session controller and its collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    /// No credential stored for the provider the thread uses
    MissingApiKey { provider: Provider },
    /// Empty or whitespace-only input
    EmptyMessage,
    /// Referenced thread is not in the conversation state
    ThreadNotFound { thread_id: String },
    /// A response is already streaming on this thread
    StreamInFlight { thread_id: String },
    /// Text selection referenced a message that does not exist
    SelectionNotFound { message_id: String },
    /// Text selection is not a substring of the message content
    SelectionMismatch { message_id: String },
    /// Connection or HTTP failure
    Transport { message: String },
    /// Malformed streamed payload
    Protocol { message: String },
    /// Research task failure or timeout reported upstream
    UpstreamTask { message: String },
    /// Failed to read or write persisted state
    Storage { message: String },
}

impl ChatError {
    /// Which class of failure this is
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::MissingApiKey { .. }
            | ChatError::EmptyMessage
            | ChatError::ThreadNotFound { .. }
            | ChatError::StreamInFlight { .. }
            | ChatError::SelectionNotFound { .. }
            | ChatError::SelectionMismatch { .. } => ErrorCategory::Validation,
            ChatError::Transport { .. } => ErrorCategory::Transport,
            ChatError::Protocol { .. } => ErrorCategory::Protocol,
            ChatError::UpstreamTask { .. } => ErrorCategory::UpstreamTask,
            ChatError::Storage { .. } => ErrorCategory::Storage,
        }
    }

    /// Whether retrying the same action can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::Transport { .. }
                | ChatError::UpstreamTask { .. }
                | ChatError::StreamInFlight { .. }
        )
    }

    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatError::MissingApiKey { .. } => "E_CHAT_NO_KEY",
            ChatError::EmptyMessage => "E_CHAT_EMPTY",
            ChatError::ThreadNotFound { .. } => "E_CHAT_NO_THREAD",
            ChatError::StreamInFlight { .. } => "E_CHAT_BUSY",
            ChatError::SelectionNotFound { .. } => "E_CHAT_SEL_GONE",
            ChatError::SelectionMismatch { .. } => "E_CHAT_SEL_TEXT",
            ChatError::Transport { .. } => "E_CHAT_TRANSPORT",
            ChatError::Protocol { .. } => "E_CHAT_PROTOCOL",
            ChatError::UpstreamTask { .. } => "E_CHAT_TASK",
            ChatError::Storage { .. } => "E_CHAT_STORAGE",
        }
    }

    /// Text suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            ChatError::MissingApiKey { provider } => format!(
                "Please add your {} API key in settings before sending.",
                provider.label()
            ),
            ChatError::EmptyMessage => "Message cannot be empty.".to_string(),
            ChatError::ThreadNotFound { .. } => {
                "That thread no longer exists.".to_string()
            }
            ChatError::StreamInFlight { .. } => {
                "Please wait for the current response to complete before sending another message."
                    .to_string()
            }
            ChatError::SelectionNotFound { .. } => {
                "The selected message could not be found.".to_string()
            }
            ChatError::SelectionMismatch { .. } => {
                "The selection no longer matches the message text.".to_string()
            }
            ChatError::Transport { message } => {
                format!("Connection problem: {}", message)
            }
            ChatError::Protocol { .. } => {
                "Received a malformed response from the provider.".to_string()
            }
            ChatError::UpstreamTask { message } => message.clone(),
            ChatError::Storage { .. } => {
                "Failed to save your conversation. Recent changes may be lost.".to_string()
            }
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::MissingApiKey { provider } => {
                write!(f, "missing API key for provider {}", provider)
            }
            ChatError::EmptyMessage => write!(f, "empty message"),
            ChatError::ThreadNotFound { thread_id } => {
                write!(f, "thread not found: {}", thread_id)
            }
            ChatError::StreamInFlight { thread_id } => {
                write!(f, "stream already in flight on thread {}", thread_id)
            }
            ChatError::SelectionNotFound { message_id } => {
                write!(f, "selection references unknown message {}", message_id)
            }
            ChatError::SelectionMismatch { message_id } => {
                write!(f, "selection does not match message {}", message_id)
            }
            ChatError::Transport { message } => write!(f, "transport error: {}", message),
            ChatError::Protocol { message } => write!(f, "protocol error: {}", message),
            ChatError::UpstreamTask { message } => write!(f, "task error: {}", message),
            ChatError::Storage { message } => write!(f, "storage error: {}", message),
        }
    }
}

impl std::error::Error for ChatError {}

impl From<crate::traits::http::HttpError> for ChatError {
    fn from(err: crate::traits::http::HttpError) -> Self {
        ChatError::Transport {
            message: err.to_string(),
        }
    }
}

impl From<crate::traits::kv::StorageError> for ChatError {
    fn from(err: crate::traits::kv::StorageError) -> Self {
        ChatError::Storage {
            message: err.to_string(),
        }
    }
}

impl From<crate::store::StoreError> for ChatError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::ThreadNotFound { thread_id } => {
                ChatError::ThreadNotFound { thread_id }
            }
        }
    }
}

impl From<crate::sse::events::SseParseError> for ChatError {
    fn from(err: crate::sse::events::SseParseError) -> Self {
        ChatError::Protocol {
            message: err.to_string(),
        }
    }
}

impl From<crate::providers::ProviderError> for ChatError {
    fn from(err: crate::providers::ProviderError) -> Self {
        use crate::providers::ProviderError;
        match err {
            ProviderError::Http(inner) => ChatError::Transport {
                message: inner.to_string(),
            },
            ProviderError::Upstream { status, message } => ChatError::Transport {
                message: format!("upstream returned {}: {}", status, message),
            },
            ProviderError::InvalidResponse { message } => ChatError::Protocol { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_share_category() {
        let errors = [
            ChatError::MissingApiKey {
                provider: Provider::Anthropic,
            },
            ChatError::EmptyMessage,
            ChatError::ThreadNotFound {
                thread_id: "t".to_string(),
            },
            ChatError::StreamInFlight {
                thread_id: "t".to_string(),
            },
        ];
        for error in errors {
            assert_eq!(error.category(), ErrorCategory::Validation);
        }
    }

    #[test]
    fn test_transport_is_retryable() {
        let error = ChatError::Transport {
            message: "connection refused".to_string(),
        };
        assert!(error.is_retryable());
        assert_eq!(error.category(), ErrorCategory::Transport);
    }

    #[test]
    fn test_validation_is_not_retryable() {
        assert!(!ChatError::EmptyMessage.is_retryable());
        assert!(!ChatError::MissingApiKey {
            provider: Provider::ParallelChat
        }
        .is_retryable());
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ChatError::EmptyMessage.error_code(), "E_CHAT_EMPTY");
        assert_eq!(
            ChatError::StreamInFlight {
                thread_id: "t".to_string()
            }
            .error_code(),
            "E_CHAT_BUSY"
        );
        assert_eq!(
            ChatError::UpstreamTask {
                message: "x".to_string()
            }
            .error_code(),
            "E_CHAT_TASK"
        );
    }

    #[test]
    fn test_busy_user_message_asks_to_wait() {
        let error = ChatError::StreamInFlight {
            thread_id: "t-1".to_string(),
        };
        assert!(error.user_message().contains("wait for the current response"));
    }

    #[test]
    fn test_missing_key_names_the_provider() {
        let error = ChatError::MissingApiKey {
            provider: Provider::ParallelResearch,
        };
        assert!(error.user_message().contains("Parallel Deep Research"));
    }

    #[test]
    fn test_display_mentions_thread_id() {
        let error = ChatError::ThreadNotFound {
            thread_id: "t-42".to_string(),
        };
        assert!(error.to_string().contains("t-42"));
    }
}
