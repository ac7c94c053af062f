//! Streaming message reconciliation.
//!
//! A [`StreamingReconciler`] owns one in-progress assistant message
//! and folds provider chunks into it: text and thinking append,
//! citations extend, progress overwrites. After every applied chunk it
//! hands out a full snapshot still marked streaming, so a consumer can
//! render incrementally without tracking deltas itself. Only the
//! update produced by `Done` clears the streaming flag; that final
//! snapshot is the one signal that the message may be persisted as
//! complete. A mid-stream error keeps whatever accumulated rather
//! than rolling it back.

use crate::models::Message;
use crate::providers::StreamChunk;

/// Result of applying one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilerUpdate {
    /// Intermediate state, still streaming
    Snapshot(Message),
    /// Terminal state after `Done`; safe to persist
    Complete(Message),
    /// Terminal failure. `partial` carries the accumulated message
    /// when any chunk landed before the error.
    Failed {
        error: String,
        partial: Option<Message>,
    },
}

/// Folds a chunk stream into one assistant message
#[derive(Debug)]
pub struct StreamingReconciler {
    message: Message,
    received_any: bool,
}

impl StreamingReconciler {
    /// Start reconciling into `message`, typically a fresh
    /// [`Message::assistant`] accumulator
    pub fn new(message: Message) -> Self {
        Self {
            message,
            received_any: false,
        }
    }

    /// Current accumulator state
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Apply one chunk and report the resulting update
    pub fn apply(&mut self, chunk: StreamChunk) -> ReconcilerUpdate {
        match chunk {
            StreamChunk::Text(delta) => {
                self.message.append_text(&delta);
                self.snapshot()
            }
            StreamChunk::Thinking(delta) => {
                self.message.append_thinking(&delta);
                self.snapshot()
            }
            StreamChunk::Citations(citations) => {
                self.message.add_citations(&citations);
                self.snapshot()
            }
            StreamChunk::Progress(progress) => {
                self.message
                    .set_progress(&progress.task_id, progress.progress, &progress.status);
                self.snapshot()
            }
            StreamChunk::Done => {
                self.message.finalize();
                ReconcilerUpdate::Complete(self.message.clone())
            }
            StreamChunk::Error(error) => {
                let partial = if self.received_any {
                    let mut message = self.message.clone();
                    message.finalize();
                    Some(message)
                } else {
                    None
                };
                ReconcilerUpdate::Failed { error, partial }
            }
        }
    }

    fn snapshot(&mut self) -> ReconcilerUpdate {
        self.received_any = true;
        ReconcilerUpdate::Snapshot(self.message.clone())
    }
}
