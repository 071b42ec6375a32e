//! Built-in tool implementations for agentbox.
//!
//! Four primitives give the agent its working directory:
//! list it, read files, write files and run scripts. Every path goes through
//! [`agentbox_security::resolve`] before the filesystem or a process is
//! touched, and the [`ToolDispatcher`] is the only way the agent loop reaches
//! them.

pub mod dispatcher;
pub mod file_read;
pub mod file_write;
pub mod files_info;
pub mod run_python;

use std::path::PathBuf;

use agentbox_core::error::ToolError;
use agentbox_core::tool::{ToolRegistry, WorkingRoot};
use agentbox_security::PathValidationError;

pub use dispatcher::{ToolDispatcher, ToolSettings};
pub use run_python::ScriptSettings;

/// Create a registry holding exactly the four sandboxed primitives.
pub fn sandboxed_registry(settings: &ToolSettings) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(files_info::FilesInfoTool));
    registry.register(Box::new(file_read::FileReadTool::new(settings.max_chars)));
    registry.register(Box::new(file_write::FileWriteTool));
    registry.register(Box::new(run_python::RunPythonTool::new(settings.script.clone())));
    registry
}

/// Resolve a model-supplied path inside `root`, mapping rejection to the
/// message the model sees. `action` is the verb used in that message.
pub(crate) fn resolve_in_root(
    root: &WorkingRoot,
    path: &str,
    tool_name: &str,
    action: &'static str,
) -> Result<PathBuf, ToolError> {
    agentbox_security::resolve(root, path).map_err(|e| match e {
        PathValidationError::OutsideRoot { .. } => ToolError::OutsideSandbox {
            action,
            path: path.into(),
        },
        other => ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: other.to_string(),
        },
    })
}

/// Optional string argument; present but not a string is an error.
pub(crate) fn optional_str<'a>(
    arguments: &'a serde_json::Value,
    key: &str,
) -> Result<Option<&'a str>, ToolError> {
    match arguments.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ToolError::InvalidArguments(format!("'{key}' must be a string"))),
    }
}

pub(crate) fn required_str<'a>(
    arguments: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, ToolError> {
    optional_str(arguments, key)?
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

pub(crate) fn os_error(tool_name: &str, e: std::io::Error) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool_name.into(),
        reason: e.to_string(),
    }
}
