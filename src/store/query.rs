//! Derived views over the thread arena
//!
//! Nothing here mutates state. Children are recovered by filtering on
//! `parent_thread_id`, so tree walks are linear scans per level.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::models::{char_prefix, Thread};

use super::ConversationState;

/// Characters of the first user message shown as a conversation title
const TITLE_CHARS: usize = 80;
/// Characters of the first user message shown as the preview line
const PREVIEW_CHARS: usize = 150;

/// One conversation tree, summarized for pickers and lists
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Root thread of the tree
    pub root_id: String,
    /// First user message cut to a title, else a numbered placeholder
    pub title: String,
    /// Longer cut of the same message
    pub preview: String,
    /// Threads in the tree
    pub thread_count: usize,
    /// Stored messages across the tree, inherited copies included
    pub message_count: usize,
    /// When the root thread was created (epoch milliseconds)
    pub created_at: i64,
}

impl ConversationState {
    /// Root threads, newest first
    pub fn root_threads(&self) -> Vec<&Thread> {
        let mut roots: Vec<&Thread> = self.threads.values().filter(|t| t.is_root()).collect();
        roots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        roots
    }

    /// Direct children of `thread_id`, oldest first
    pub fn child_threads(&self, thread_id: &str) -> Vec<&Thread> {
        let mut children: Vec<&Thread> = self
            .threads
            .values()
            .filter(|t| t.parent_thread_id.as_deref() == Some(thread_id))
            .collect();
        children.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        children
    }

    /// Every thread id in the tree containing `thread_id`, root first.
    ///
    /// Walks up to the root, then breadth-first over descendants.
    /// Unknown ids yield an empty list.
    pub fn thread_ids_in_tree(&self, thread_id: &str) -> Vec<String> {
        let Some(root_id) = self.root_of(thread_id) else {
            return Vec::new();
        };

        let mut ids = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([root_id]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id.clone()) {
                continue;
            }
            for child in self.child_threads(&id) {
                queue.push_back(child.id.clone());
            }
            ids.push(id);
        }
        ids
    }

    /// Number of threads in the tree containing `thread_id`
    pub fn thread_count_in_tree(&self, thread_id: &str) -> usize {
        self.thread_ids_in_tree(thread_id).len()
    }

    /// Stored messages across the tree containing `thread_id`.
    ///
    /// Counts every message each thread holds, so branch-inherited
    /// copies contribute once per thread carrying them.
    pub fn message_count_in_tree(&self, thread_id: &str) -> usize {
        self.thread_ids_in_tree(thread_id)
            .iter()
            .filter_map(|id| self.threads.get(id))
            .map(|thread| thread.messages.len())
            .sum()
    }

    /// Summaries of every conversation tree, newest first.
    ///
    /// Conversations with no user message yet fall back to a numbered
    /// title, counted from the oldest conversation up.
    pub fn conversation_summaries(&self) -> Vec<ConversationSummary> {
        let roots = self.root_threads();
        let total = roots.len();
        roots
            .into_iter()
            .enumerate()
            .map(|(index, root)| {
                let first_user = root.first_user_message();
                let title = first_user
                    .map(|m| char_prefix(&m.content, TITLE_CHARS))
                    .unwrap_or_else(|| format!("Conversation {}", total - index));
                let preview = first_user
                    .map(|m| char_prefix(&m.content, PREVIEW_CHARS))
                    .unwrap_or_else(|| "No messages yet".to_string());
                ConversationSummary {
                    root_id: root.id.clone(),
                    title,
                    preview,
                    thread_count: self.thread_count_in_tree(&root.id),
                    message_count: self.message_count_in_tree(&root.id),
                    created_at: root.created_at,
                }
            })
            .collect()
    }

    /// The active threads resolved in pane order, skipping ids that no
    /// longer resolve
    pub fn active_threads(&self) -> Vec<&Thread> {
        self.active_thread_ids
            .iter()
            .filter_map(|id| self.threads.get(id))
            .collect()
    }
}

// ============= Query Tests =============
