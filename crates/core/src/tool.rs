//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what let the model act on its working directory: list it, read
//! and write files in it, run scripts in it. Every tool is handed the
//! [`WorkingRoot`] by its caller; the model never supplies it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use crate::error::{Error, ToolError};
use crate::message::MessageToolCall;
use crate::provider::ToolDefinition;

/// The directory every tool operation is confined to.
///
/// Always absolute and canonical; fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingRoot(PathBuf);

impl WorkingRoot {
    /// Canonicalize `path` and check it is an existing directory.
    pub fn new(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let canonical = path.canonicalize().map_err(|e| Error::Config {
            message: format!("working directory '{}' is not accessible: {e}", path.display()),
        })?;
        if !canonical.is_dir() {
            return Err(Error::Config {
                message: format!("working directory '{}' is not a directory", path.display()),
            });
        }
        Ok(Self(canonical))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for WorkingRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A request to execute a tool, with its arguments parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON object
    pub arguments: serde_json::Value,
}

impl TryFrom<&MessageToolCall> for ToolCall {
    type Error = ToolError;

    /// Parse the model's raw argument string. Blank means "no arguments";
    /// anything that is not a JSON object is rejected.
    fn try_from(call: &MessageToolCall) -> Result<Self, Self::Error> {
        let raw = call.arguments.trim();
        let arguments = if raw.is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str::<serde_json::Value>(raw).map_err(|e| {
                ToolError::InvalidArguments(format!("not valid JSON: {e}"))
            })?
        };
        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments(
                "arguments must be a JSON object".into(),
            ));
        }
        Ok(Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments,
        })
    }
}

/// The outcome of one tool invocation, always carrying a string payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolResult {
    /// The tool ran; payload is its output
    Ok(String),
    /// The tool was refused or failed; payload is the reason
    Err(String),
}

impl ToolResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// The raw payload, without any error prefix.
    pub fn payload(&self) -> &str {
        match self {
            Self::Ok(text) | Self::Err(text) => text,
        }
    }

    /// Plain-text form embedded in the `tool` message sent back to the model.
    pub fn render(&self) -> String {
        match self {
            Self::Ok(text) => text.clone(),
            Self::Err(message) => format!("Error: {message}"),
        }
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(output) => Self::Ok(output),
            Err(e) => Self::Err(e.to_string()),
        }
    }
}

/// The core Tool trait.
///
/// Each primitive (get_files_info, get_file_content, write_file, run_python)
/// implements this trait. Tools are registered in the ToolRegistry and reached
/// only through the dispatcher, which owns the working root.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_file_content").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool inside `root` with the given arguments.
    async fn execute(
        &self,
        root: &WorkingRoot,
        arguments: &serde_json::Value,
    ) -> std::result::Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, keyed by name.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
