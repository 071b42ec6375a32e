//! ConversationStore trait: cross-invocation conversation memory.
//!
//! The agent loop reloads the previous conversation at the start of a run and
//! persists it at the end, so a follow-up prompt sees everything that came
//! before until the history is cleared.

use async_trait::async_trait;
use crate::error::MemoryError;
use crate::message::Message;

/// Load/save/clear contract for the persisted message history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Human-readable backend name (e.g., "json_file", "in_memory").
    fn name(&self) -> &str;

    /// Load the persisted history.
    ///
    /// Absent or malformed state yields an empty history, never an error;
    /// `Err` is reserved for the store itself being unreachable.
    async fn load(&self) -> Result<Vec<Message>, MemoryError>;

    /// Replace the persisted history with `messages`.
    async fn save(&self, messages: &[Message]) -> Result<(), MemoryError>;

    /// Delete the persisted history. Returns whether anything was deleted.
    async fn clear(&self) -> Result<bool, MemoryError>;
}
