//! File write tool: create or overwrite files inside the working root.

use async_trait::async_trait;
use agentbox_core::error::ToolError;
use agentbox_core::tool::{Tool, WorkingRoot};
use tracing::debug;

use crate::{os_error, required_str, resolve_in_root};

/// Writes a file, creating missing parent directories.
pub struct FileWriteTool;

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes or overwrites content to a specified file within the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to write to, relative to the working directory."
                },
                "content": {
                    "type": "string",
                    "description": "The content to write into the file."
                }
            },
            "required": ["file_path", "content"]
        })
    }

    async fn execute(
        &self,
        root: &WorkingRoot,
        arguments: &serde_json::Value,
    ) -> Result<String, ToolError> {
        let file_path = required_str(arguments, "file_path")?;
        let content = required_str(arguments, "content")?;
        let target = resolve_in_root(root, file_path, self.name(), "write to")?;

        if tokio::fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("\"{file_path}\" is a directory"),
            });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| os_error(self.name(), e))?;
        }

        tokio::fs::write(&target, content)
            .await
            .map_err(|e| os_error(self.name(), e))?;

        let written = content.chars().count();
        debug!(file = %file_path, chars = written, "Wrote file");
        Ok(format!(
            "Successfully wrote to \"{file_path}\" ({written} characters written)"
        ))
    }
}
