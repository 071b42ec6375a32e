//! Tool dispatcher: the single route from a tool name to a primitive.
//!
//! The dispatcher is bound to one [`WorkingRoot`] at construction and injects
//! it into every call, so the model never supplies or sees it. Every outcome,
//! including an unknown name or a tool failure, comes back as a
//! [`ToolResult`].

use std::sync::Arc;
use std::time::Instant;

use agentbox_core::error::ToolError;
use agentbox_core::event::{DomainEvent, EventBus};
use agentbox_core::message::MessageToolCall;
use agentbox_core::provider::ToolDefinition;
use agentbox_core::tool::{ToolCall, ToolRegistry, ToolResult, WorkingRoot};
use chrono::Utc;
use tracing::{debug, warn};

use crate::file_read::DEFAULT_MAX_CHARS;
use crate::run_python::ScriptSettings;

/// Longest tool output carried in a `ToolCompleted` event.
const EVENT_OUTPUT_PREVIEW_CHARS: usize = 2_000;

/// Settings for the built-in primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Character limit for `get_file_content`.
    pub max_chars: usize,
    /// Launch settings for `run_python`.
    pub script: ScriptSettings,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            script: ScriptSettings::default(),
        }
    }
}

pub struct ToolDispatcher {
    root: WorkingRoot,
    registry: ToolRegistry,
    events: Arc<EventBus>,
}

impl ToolDispatcher {
    /// Dispatcher over exactly the four sandboxed primitives.
    pub fn new(root: WorkingRoot, settings: &ToolSettings, events: Arc<EventBus>) -> Self {
        Self::with_registry(root, crate::sandboxed_registry(settings), events)
    }

    /// Dispatcher over a caller-supplied registry.
    pub fn with_registry(root: WorkingRoot, registry: ToolRegistry, events: Arc<EventBus>) -> Self {
        Self {
            root,
            registry,
            events,
        }
    }

    /// Schemas advertised to the model, sorted by tool name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Run one tool call and normalize its outcome.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "Model requested unknown tool");
            return ToolResult::Err(ToolError::NotFound(call.name.clone()).to_string());
        };

        self.events.publish(DomainEvent::ToolStarted {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let result = ToolResult::from(tool.execute(&self.root, &call.arguments).await);
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(tool = %call.name, success = result.is_ok(), duration_ms, "Tool finished");

        self.events.publish(DomainEvent::ToolCompleted {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success: result.is_ok(),
            duration_ms,
            output: preview(&result.render()),
            timestamp: Utc::now(),
        });

        result
    }

    /// Parse the model's raw arguments, then dispatch.
    pub async fn dispatch_message(&self, call: &MessageToolCall) -> ToolResult {
        if self.registry.get(&call.name).is_none() {
            warn!(tool = %call.name, "Model requested unknown tool");
            return ToolResult::Err(ToolError::NotFound(call.name.clone()).to_string());
        }
        match ToolCall::try_from(call) {
            Ok(parsed) => self.dispatch(&parsed).await,
            Err(e) => {
                let reason = match e {
                    ToolError::InvalidArguments(reason) => reason,
                    other => other.to_string(),
                };
                warn!(tool = %call.name, %reason, "Unparsable tool arguments");
                ToolResult::Err(format!("Invalid arguments for {}: {reason}", call.name))
            }
        }
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(EVENT_OUTPUT_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
