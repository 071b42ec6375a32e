//! File-based conversation store: one pretty-printed JSON array.
//!
//! The whole history is rewritten on every save: it is serialized to a
//! sibling temp file which is then renamed over the target, so a crash never
//! leaves a half-written history behind. A file that does not parse, or that
//! holds tool results without a matching tool call, is treated as no history.

use async_trait::async_trait;
use agentbox_core::error::MemoryError;
use agentbox_core::message::{validate_messages, Message};
use agentbox_core::store::ConversationStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Parse stored content, rejecting malformed or inconsistent history.
fn parse(content: &str) -> Result<Vec<Message>, MemoryError> {
    let messages = serde_json::from_str::<Vec<Message>>(content)
        .map_err(|e| MemoryError::Corrupted(format!("not a message array: {e}")))?;
    validate_messages(&messages).map_err(|e| MemoryError::Corrupted(e.to_string()))?;
    Ok(messages)
}

#[async_trait]
impl ConversationStore for JsonFileStore {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn load(&self) -> Result<Vec<Message>, MemoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(path = %self.path.display(), "Conversation history is not UTF-8, ignoring it");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let messages = match parse(&content) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring conversation history");
                Vec::new()
            }
        };
        debug!(path = %self.path.display(), count = messages.len(), "Conversation history loaded");
        Ok(messages)
    }

    async fn save(&self, messages: &[Message]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create history directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(messages).map_err(|e| {
            MemoryError::Storage(format!("Failed to serialize conversation history: {e}"))
        })?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, content).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to write {}: {e}", temp.display()))
        })?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), count = messages.len(), "Conversation history saved");
        Ok(())
    }

    async fn clear(&self) -> Result<bool, MemoryError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Conversation history cleared");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(MemoryError::Storage(format!(
                "Failed to delete {}: {e}",
                self.path.display()
            ))),
        }
    }
}
