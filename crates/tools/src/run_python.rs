//! Script tool: run a script inside the working root with a hard timeout.
//!
//! The interpreter is launched directly (no shell) with the working root as
//! its current directory and stdin closed. Output is captured in full.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use agentbox_core::error::ToolError;
use agentbox_core::tool::{Tool, WorkingRoot};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{required_str, resolve_in_root};

/// How scripts are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSettings {
    /// Program the script path is passed to (e.g., "python3").
    pub interpreter: String,
    /// Required file extension, without the dot.
    pub extension: String,
    /// Wall-clock limit; the process is killed when it runs out.
    pub timeout: Duration,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            extension: "py".into(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct RunPythonTool {
    settings: ScriptSettings,
}

impl RunPythonTool {
    pub fn new(settings: ScriptSettings) -> Self {
        Self { settings }
    }
}

impl Default for RunPythonTool {
    fn default() -> Self {
        Self::new(ScriptSettings::default())
    }
}

/// Extract `args` as strings. Numbers and booleans are stringified.
fn script_args(arguments: &serde_json::Value) -> Result<Vec<String>, ToolError> {
    match arguments.get("args") {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                serde_json::Value::String(s) => Ok(s.clone()),
                serde_json::Value::Number(n) => Ok(n.to_string()),
                serde_json::Value::Bool(b) => Ok(b.to_string()),
                other => Err(ToolError::InvalidArguments(format!(
                    "'args' items must be strings, got {other}"
                ))),
            })
            .collect(),
        Some(_) => Err(ToolError::InvalidArguments("'args' must be an array of strings".into())),
    }
}

fn format_output(stdout: &str, stderr: &str, exit_code: Option<i32>) -> String {
    if stdout.is_empty() && stderr.is_empty() {
        return "No output produced.".into();
    }
    let mut result = format!("STDOUT: {stdout}\nSTDERR: {stderr}\n");
    match exit_code {
        Some(0) => {}
        Some(code) => result.push_str(&format!("Process exited with code {code}")),
        None => result.push_str("Process terminated by signal"),
    }
    result
}

#[async_trait]
impl Tool for RunPythonTool {
    fn name(&self) -> &str {
        "run_python"
    }

    fn description(&self) -> &str {
        "Executes a specified Python file with optional arguments, limited to the working directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the Python file to execute, relative to the working directory."
                },
                "args": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Optional command-line arguments passed to the script."
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
        let args = script_args(arguments)?;
        let target = resolve_in_root(root, file_path, self.name(), "execute")?;

        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(ToolError::FileNotFound(file_path.into()));
        }
        if target.extension().and_then(|e| e.to_str()) != Some(self.settings.extension.as_str()) {
            return Err(ToolError::WrongExtension {
                path: file_path.into(),
                expected: self.settings.extension.clone(),
            });
        }

        debug!(
            interpreter = %self.settings.interpreter,
            script = %target.display(),
            ?args,
            "Running script"
        );

        let child = Command::new(&self.settings.interpreter)
            .arg(&target)
            .args(&args)
            .current_dir(root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: format!("failed to start {}: {e}", self.settings.interpreter),
            })?;

        // Dropping the child on timeout kills it.
        let output = match tokio::time::timeout(self.settings.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                warn!(script = %file_path, timeout_secs = self.settings.timeout.as_secs(), "Script timed out");
                return Err(ToolError::Timeout {
                    tool_name: self.name().into(),
                    timeout_secs: self.settings.timeout.as_secs(),
                });
            }
        };

        let exit_code = output.status.code();
        if exit_code != Some(0) {
            warn!(script = %file_path, ?exit_code, "Script exited unsuccessfully");
        }

        Ok(format_output(
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
            exit_code,
        ))
    }
}
