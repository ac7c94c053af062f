//! Message operations on stored threads

use crate::models::Message;

use super::{ConversationState, StoreError};

impl ConversationState {
    /// Append a message to `thread_id`
    pub fn push_message(&mut self, thread_id: &str, message: Message) -> Result<(), StoreError> {
        let thread = self
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;
        thread.messages.push(message);
        Ok(())
    }

    /// Replace the message with the same id, appending if it is new.
    ///
    /// Streaming snapshots land through this: the first snapshot
    /// appends the assistant message, every later one replaces it in
    /// place.
    pub fn upsert_message(&mut self, thread_id: &str, message: Message) -> Result<(), StoreError> {
        let thread = self
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound {
                thread_id: thread_id.to_string(),
            })?;

        match thread.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => thread.messages.push(message),
        }
        Ok(())
    }

    /// True while any message in `thread_id` is an in-flight streaming
    /// snapshot. Unknown threads are not streaming.
    pub fn is_thread_streaming(&self, thread_id: &str) -> bool {
        self.threads
            .get(thread_id)
            .is_some_and(|thread| thread.messages.iter().any(|m| m.is_streaming))
    }
}

// ============= Message Operation Tests =============

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;

    #[test]
    fn test_push_message_appends_in_order() {
        let mut state = ConversationState::new();
        let thread_id = state.current_thread_id.clone();

        state
            .push_message(&thread_id, Message::user(&thread_id, "first"))
            .unwrap();
        state
            .push_message(&thread_id, Message::user(&thread_id, "second"))
            .unwrap();

        let messages = &state.thread(&thread_id).unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }

    #[test]
    fn test_push_message_unknown_thread_errs() {
        let mut state = ConversationState::new();
        let message = Message::user("ghost", "hello");

        let result = state.push_message("ghost", message);

        assert_eq!(
            result,
            Err(StoreError::ThreadNotFound {
                thread_id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn test_upsert_message_appends_then_replaces() {
        let mut state = ConversationState::new();
        let thread_id = state.current_thread_id.clone();

        let mut snapshot = Message::assistant(&thread_id, Provider::Anthropic);
        snapshot.content = "Hel".to_string();
        state.upsert_message(&thread_id, snapshot.clone()).unwrap();

        snapshot.content = "Hello".to_string();
        state.upsert_message(&thread_id, snapshot.clone()).unwrap();

        let messages = &state.thread(&thread_id).unwrap().messages;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Hello");
    }

    #[test]
    fn test_upsert_message_keeps_position_among_later_messages() {
        let mut state = ConversationState::new();
        let thread_id = state.current_thread_id.clone();

        let mut snapshot = Message::assistant(&thread_id, Provider::Anthropic);
        snapshot.content = "draft".to_string();
        state.upsert_message(&thread_id, snapshot.clone()).unwrap();
        state
            .push_message(&thread_id, Message::user(&thread_id, "follow-up"))
            .unwrap();

        snapshot.content = "final".to_string();
        state.upsert_message(&thread_id, snapshot).unwrap();

        let messages = &state.thread(&thread_id).unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "final");
        assert_eq!(messages[1].content, "follow-up");
    }

    #[test]
    fn test_upsert_message_unknown_thread_errs() {
        let mut state = ConversationState::new();

        let result = state.upsert_message("ghost", Message::user("ghost", "hello"));

        assert!(result.is_err());
    }

    #[test]
    fn test_is_thread_streaming_follows_snapshot_flag() {
        let mut state = ConversationState::new();
        let thread_id = state.current_thread_id.clone();
        assert!(!state.is_thread_streaming(&thread_id));

        let mut snapshot = Message::assistant(&thread_id, Provider::Anthropic);
        state.upsert_message(&thread_id, snapshot.clone()).unwrap();
        assert!(state.is_thread_streaming(&thread_id));

        snapshot.finalize();
        state.upsert_message(&thread_id, snapshot).unwrap();
        assert!(!state.is_thread_streaming(&thread_id));
    }

    #[test]
    fn test_is_thread_streaming_false_for_unknown_thread() {
        let state = ConversationState::new();
        assert!(!state.is_thread_streaming("ghost"));
    }
}
