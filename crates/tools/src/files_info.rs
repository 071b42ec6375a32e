//! Directory listing tool: entries of a directory inside the working root.

use async_trait::async_trait;
use agentbox_core::error::ToolError;
use agentbox_core::tool::{Tool, WorkingRoot};
use tracing::debug;

use crate::{optional_str, os_error, resolve_in_root};

/// Lists a directory with sizes and kinds, one line per entry.
pub struct FilesInfoTool;

#[async_trait]
impl Tool for FilesInfoTool {
    fn name(&self) -> &str {
        "get_files_info"
    }

    fn description(&self) -> &str {
        "Lists files in the specified directory along with their sizes, constrained to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "The directory to list files from, relative to the working directory. If not provided, lists files in the working directory itself."
                }
            }
        })
    }

    async fn execute(
        &self,
        root: &WorkingRoot,
        arguments: &serde_json::Value,
    ) -> Result<String, ToolError> {
        let directory = optional_str(arguments, "directory")?.unwrap_or(".");
        let target = resolve_in_root(root, directory, self.name(), "list")?;

        let is_dir = tokio::fs::metadata(&target)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(ToolError::NotADirectory(directory.into()));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&target)
            .await
            .map_err(|e| os_error(self.name(), e))?;
        while let Some(entry) = dir.next_entry().await.map_err(|e| os_error(self.name(), e))? {
            // Follow symlinks for size and kind; a dangling one reports the link itself.
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(_) => entry.metadata().await.map_err(|e| os_error(self.name(), e))?,
            };
            entries.push((
                entry.file_name().to_string_lossy().into_owned(),
                metadata.len(),
                metadata.is_dir(),
            ));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(directory = %directory, entries = entries.len(), "Listed directory");

        Ok(entries
            .iter()
            .map(|(name, size, is_dir)| format!("- {name}: file_size={size} bytes, is_dir={is_dir}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
