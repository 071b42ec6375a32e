//! File read tool: read file contents inside the working root.

use std::path::Path;

use async_trait::async_trait;
use agentbox_core::error::ToolError;
use agentbox_core::tool::{Tool, WorkingRoot};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::{os_error, required_str, resolve_in_root};

/// Default number of characters returned before truncation.
pub const DEFAULT_MAX_CHARS: usize = 10_000;

pub struct FileReadTool {
    /// Characters returned before the truncation marker is appended.
    max_chars: usize,
}

impl FileReadTool {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Default for FileReadTool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

/// Bytes needed to hold `max_chars` characters of UTF-8.
const MAX_BYTES_PER_CHAR: usize = 4;

fn marker(file_path: &str, max_chars: usize) -> String {
    format!("[...File \"{file_path}\" truncated at {max_chars} characters]")
}

/// Read at most enough bytes for `max_chars` characters. The flag reports
/// whether the file continues past them.
async fn read_prefix(path: &Path, max_chars: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let budget = max_chars.saturating_mul(MAX_BYTES_PER_CHAR) as u64;
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::new();
    (&mut file).take(budget).read_to_end(&mut buf).await?;
    let mut next = [0u8; 1];
    let more = file.read(&mut next).await? > 0;
    Ok((buf, more))
}

/// Decode the prefix, keep the first `max_chars` characters and append the
/// marker if anything was dropped. Invalid UTF-8 is only an error when it
/// falls inside the returned characters.
fn decode_prefix(buf: &[u8], more: bool, max_chars: usize, file_path: &str) -> Result<String, String> {
    let (valid, clean) = match std::str::from_utf8(buf) {
        Ok(text) => (text, true),
        Err(e) => (
            std::str::from_utf8(&buf[..e.valid_up_to()]).unwrap_or_default(),
            false,
        ),
    };

    if let Some((byte_index, _)) = valid.char_indices().nth(max_chars) {
        return Ok(format!("{}{}", &valid[..byte_index], marker(file_path, max_chars)));
    }
    if !clean && valid.chars().count() < max_chars {
        return Err("file is not valid UTF-8".into());
    }
    if !clean || more {
        return Ok(format!("{valid}{}", marker(file_path, max_chars)));
    }
    Ok(valid.to_string())
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "get_file_content"
    }

    fn description(&self) -> &str {
        "Reads the contents of a file in the working directory, truncated if it is longer than the configured character limit."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to read, relative to the working directory."
                }
            },
            "required": ["file_path"]
        })
    }

    async fn execute(
        &self,
        root: &WorkingRoot,
        arguments: &serde_json::Value,
    ) -> Result<String, ToolError> {
        let file_path = required_str(arguments, "file_path")?;
        let target = resolve_in_root(root, file_path, self.name(), "read")?;

        let is_file = tokio::fs::metadata(&target)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(ToolError::NotAFile(file_path.into()));
        }

        let (buf, more) = read_prefix(&target, self.max_chars)
            .await
            .map_err(|e| os_error(self.name(), e))?;
        debug!(file = %file_path, bytes = buf.len(), more, "Read file");

        decode_prefix(&buf, more, self.max_chars, file_path).map_err(|reason| {
            ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason,
            }
        })
    }
}
