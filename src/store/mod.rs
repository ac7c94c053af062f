//! Conversation state: the thread arena and its aggregate invariants
//!
//! All threads live in a single map keyed by id. Parent/child structure
//! is carried on the threads themselves (`parent_thread_id`); children
//! are derived by filtering, never stored. The aggregate tracks which
//! threads are on screen (`active_thread_ids`), which conversation tree
//! is open (`main_thread_id`) and where input goes (`current_thread_id`).
//!
//! - `thread`: lifecycle operations (create, branch, navigate, close)
//! - `message`: per-thread message operations
//! - `query`: derived views (roots, trees, conversation summaries)

pub mod message;
pub mod query;
pub mod thread;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Thread;

pub use query::ConversationSummary;

/// Errors from thread store operations
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The referenced thread does not exist in the arena
    ThreadNotFound { thread_id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ThreadNotFound { thread_id } => {
                write!(f, "Thread not found: {}", thread_id)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// The whole conversation state, serialized as one camelCase JSON
/// document (the format existing browser stores were written in).
///
/// Invariants held by every operation:
/// - `current_thread_id` resolves to a thread in `threads`
/// - `main_thread_id` is the root of the current thread's tree
/// - `active_thread_ids` is `[current]` for roots and
///   `[parent, current]` for branches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Thread arena, keyed by thread id
    pub threads: HashMap<String, Thread>,
    /// Threads currently on screen, parent before child
    pub active_thread_ids: Vec<String>,
    /// Root of the open conversation tree
    pub main_thread_id: String,
    /// Thread receiving input
    pub current_thread_id: String,
}

impl ConversationState {
    /// Fresh state with a single empty root thread
    pub fn new() -> Self {
        let root = Thread::root();
        let root_id = root.id.clone();
        let mut threads = HashMap::new();
        threads.insert(root_id.clone(), root);
        Self {
            threads,
            active_thread_ids: vec![root_id.clone()],
            main_thread_id: root_id.clone(),
            current_thread_id: root_id,
        }
    }

    /// The thread input currently goes to
    pub fn current_thread(&self) -> Option<&Thread> {
        self.threads.get(&self.current_thread_id)
    }

    /// Look up a thread by id
    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.get(thread_id)
    }

    /// Root of the tree containing `thread_id`, walking parent pointers.
    ///
    /// Returns None for unknown ids. A dangling parent pointer or a
    /// parent cycle (possible in hand-edited stores) stops the walk at
    /// the last resolvable thread, which is treated as the effective
    /// root.
    pub fn root_of(&self, thread_id: &str) -> Option<String> {
        let mut current = self.threads.get(thread_id)?;
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(current.id.as_str());

        while let Some(parent_id) = &current.parent_thread_id {
            match self.threads.get(parent_id) {
                Some(parent) if seen.insert(parent.id.as_str()) => current = parent,
                _ => break,
            }
        }
        Some(current.id.clone())
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}

// ============= Conversation State Tests =============
