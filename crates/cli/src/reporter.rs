//! Terminal notifications for tool activity.
//!
//! Subscribes to the event bus and prints to stderr. Nothing here feeds
//! back into the agent loop.

use std::sync::Arc;

use agentbox_core::event::{DomainEvent, EventBus};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// How much tool activity to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Silent,
    Normal,
    Verbose,
}

/// Render one event as terminal lines, or nothing.
pub fn render(event: &DomainEvent, verbosity: Verbosity) -> Option<String> {
    match (event, verbosity) {
        (_, Verbosity::Silent) => None,
        (DomainEvent::ToolStarted { tool_name, arguments, .. }, Verbosity::Verbose) => {
            Some(format!("Calling function: {tool_name}({arguments})"))
        }
        (DomainEvent::ToolStarted { tool_name, .. }, Verbosity::Normal) => {
            Some(format!(" - Calling function: {tool_name}"))
        }
        (
            DomainEvent::ToolCompleted {
                tool_name,
                success,
                duration_ms,
                output,
                ..
            },
            Verbosity::Verbose,
        ) => {
            let status = if *success { "ok" } else { "error" };
            Some(format!("-> {tool_name} [{status}, {duration_ms}ms]\n{output}"))
        }
        (DomainEvent::IterationLimitReached { iterations, .. }, _) => Some(format!(
            "Stopped after {iterations} iterations without a final answer"
        )),
        _ => None,
    }
}

/// Print events until the bus is dropped.
pub fn spawn(events: &Arc<EventBus>, verbosity: Verbosity) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(line) = render(&event, verbosity) {
                        eprintln!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Reporter fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Wait for the reporter to drain. A failed reporter never fails the run.
pub async fn finish(handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "Reporter task ended abnormally");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn started() -> DomainEvent {
        DomainEvent::ToolStarted {
            call_id: "call_1".into(),
            tool_name: "get_file_content".into(),
            arguments: serde_json::json!({"file_path": "main.py"}),
            timestamp: Utc::now(),
        }
    }

    fn completed() -> DomainEvent {
        DomainEvent::ToolCompleted {
            call_id: "call_1".into(),
            tool_name: "get_file_content".into(),
            success: true,
            duration_ms: 3,
            output: "print('hi')".into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn normal_shows_tool_names_only() {
        assert_eq!(
            render(&started(), Verbosity::Normal).as_deref(),
            Some(" - Calling function: get_file_content")
        );
        assert!(render(&completed(), Verbosity::Normal).is_none());
    }

    #[test]
    fn verbose_shows_arguments_and_results() {
        let line = render(&started(), Verbosity::Verbose).unwrap();
        assert!(line.contains("get_file_content"));
        assert!(line.contains("main.py"));

        let result = render(&completed(), Verbosity::Verbose).unwrap();
        assert!(result.contains("print('hi')"));
        assert!(result.contains("ok"));
    }

    #[test]
    fn silent_shows_nothing() {
        assert!(render(&started(), Verbosity::Silent).is_none());
        let limit = DomainEvent::IterationLimitReached {
            conversation_id: "c".into(),
            iterations: 20,
            timestamp: Utc::now(),
        };
        assert!(render(&limit, Verbosity::Silent).is_none());
        assert!(render(&limit, Verbosity::Normal).unwrap().contains("20"));
    }

    #[tokio::test]
    async fn finish_absorbs_a_panicked_reporter() {
        let handle = tokio::spawn(async { panic!("reporter exploded") });
        finish(handle).await;
    }

    #[tokio::test]
    async fn finish_returns_once_the_bus_closes() {
        let events = Arc::new(EventBus::default());
        let handle = spawn(&events, Verbosity::Silent);
        events.publish(started());
        drop(events);
        finish(handle).await;
    }
}
