//! Thread lifecycle: creating, branching, navigating and closing

use crate::models::Thread;

use super::{ConversationState, StoreError};

impl ConversationState {
    /// Create a fresh root thread and make it the open conversation.
    ///
    /// The new thread becomes `main_thread_id`, `current_thread_id` and
    /// the sole active thread. Existing threads stay in the arena.
    pub fn create_root_thread(&mut self) -> String {
        let root = Thread::root();
        let root_id = root.id.clone();
        self.threads.insert(root_id.clone(), root);
        self.main_thread_id = root_id.clone();
        self.current_thread_id = root_id.clone();
        self.active_thread_ids = vec![root_id.clone()];
        root_id
    }

    /// Branch a child thread off `parent_thread_id` at `parent_message_id`.
    ///
    /// The child inherits copies of the parent's messages up to and
    /// including the branch point (the whole list if the message id is
    /// unknown), becomes the current thread, and the active set becomes
    /// the parent/child pair. Errs only when the parent thread does not
    /// exist.
    pub fn create_child_thread(
        &mut self,
        parent_thread_id: &str,
        parent_message_id: &str,
        selected_text: Option<String>,
    ) -> Result<String, StoreError> {
        let parent = self
            .threads
            .get(parent_thread_id)
            .ok_or_else(|| StoreError::ThreadNotFound {
                thread_id: parent_thread_id.to_string(),
            })?;

        let child = Thread::branch_from(parent, parent_message_id, selected_text);
        let child_id = child.id.clone();
        self.threads.insert(child_id.clone(), child);
        self.active_thread_ids = vec![parent_thread_id.to_string(), child_id.clone()];
        self.current_thread_id = child_id.clone();
        Ok(child_id)
    }

    /// Make `thread_id` the current thread.
    ///
    /// The active set becomes `[parent, thread_id]` when the target has
    /// a parent pointer, else `[thread_id]`, and `main_thread_id` is
    /// re-rooted to the target's tree, so navigating into another tree
    /// switches conversations. Returns false (no state change) for
    /// unknown ids. Idempotent.
    pub fn navigate_to(&mut self, thread_id: &str) -> bool {
        let Some(thread) = self.threads.get(thread_id) else {
            return false;
        };

        self.active_thread_ids = match &thread.parent_thread_id {
            Some(parent_id) => vec![parent_id.clone(), thread_id.to_string()],
            None => vec![thread_id.to_string()],
        };
        self.current_thread_id = thread_id.to_string();
        if let Some(root_id) = self.root_of(thread_id) {
            self.main_thread_id = root_id;
        }
        true
    }

    /// Close `thread_id`, navigating to its parent (or the main thread
    /// when the parent is gone).
    ///
    /// The thread stays in the arena; only the active set changes.
    /// Returns false for the main thread and for unknown ids.
    pub fn close_thread(&mut self, thread_id: &str) -> bool {
        if thread_id == self.main_thread_id {
            return false;
        }
        let Some(thread) = self.threads.get(thread_id) else {
            return false;
        };

        let destination = thread
            .parent_thread_id
            .clone()
            .filter(|parent_id| self.threads.contains_key(parent_id))
            .unwrap_or_else(|| self.main_thread_id.clone());
        self.navigate_to(&destination)
    }

    /// Replace the stored thread with the same id, inserting if absent
    pub fn update_thread(&mut self, thread: Thread) {
        self.threads.insert(thread.id.clone(), thread);
    }

    /// Start a fresh conversation: a new root tree, leaving previous
    /// conversations in the arena for later navigation.
    pub fn start_new_conversation(&mut self) -> String {
        self.create_root_thread()
    }
}

// ============= Thread Lifecycle Tests =============
