//! In-memory store: useful for testing and `--no-history` sessions.

use async_trait::async_trait;
use agentbox_core::error::MemoryError;
use agentbox_core::message::Message;
use agentbox_core::store::ConversationStore;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps the history in a Vec for the lifetime of the process.
#[derive(Clone)]
pub struct InMemoryStore {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start from an existing history.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: Arc::new(RwLock::new(messages)),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self) -> Result<Vec<Message>, MemoryError> {
        Ok(self.messages.read().await.clone())
    }

    async fn save(&self, messages: &[Message]) -> Result<(), MemoryError> {
        *self.messages.write().await = messages.to_vec();
        Ok(())
    }

    async fn clear(&self) -> Result<bool, MemoryError> {
        let mut messages = self.messages.write().await;
        let had_history = !messages.is_empty();
        messages.clear();
        Ok(had_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let store = InMemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());

        store
            .save(&[Message::user("Rust is fast"), Message::assistant("Yes")])
            .await
            .unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].text(), "Rust is fast");
    }

    #[tokio::test]
    async fn clones_share_history() {
        let store = InMemoryStore::new();
        let handle = store.clone();
        store.save(&[Message::user("shared")]).await.unwrap();
        assert_eq!(handle.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_reports_previous_state() {
        let store = InMemoryStore::with_messages(vec![Message::user("x")]);
        assert!(store.clear().await.unwrap());
        assert!(!store.clear().await.unwrap());
        assert!(store.load().await.unwrap().is_empty());
    }
}
