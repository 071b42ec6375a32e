//! The agent reasoning loop implementation.

use std::sync::Arc;
use agentbox_core::event::{DomainEvent, EventBus};
use agentbox_core::message::{Conversation, Message, Role};
use agentbox_core::provider::{Provider, ProviderRequest};
use agentbox_core::store::ConversationStore;
use agentbox_tools::ToolDispatcher;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::prompt::DEFAULT_SYSTEM_PROMPT;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model answered with text and no tool calls
    FinalAnswer,
    /// The iteration budget ran out first
    IterationLimit,
}

/// The result of one prompt's worth of model calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// The final answer, or on exhaustion the last text the model produced
    pub text: Option<String>,
    /// Model calls made
    pub iterations: u32,
    pub stop_reason: StopReason,
    /// Tool calls dispatched
    pub tool_calls: usize,
}

/// The core agent loop that orchestrates LLM calls and tool execution.
pub struct AgentLoop {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Max tokens per response
    max_tokens: Option<u32>,

    /// Routes tool calls to the sandboxed primitives
    dispatcher: Arc<ToolDispatcher>,

    /// Inserted as the first message when the conversation has none
    system_prompt: String,

    /// Model calls allowed per prompt
    max_iterations: u32,

    /// Model calls that must happen before a text answer is accepted
    min_iterations: u32,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        dispatcher: Arc<ToolDispatcher>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            dispatcher,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: 20,
            min_iterations: 0,
            event_bus,
        }
    }

    /// Set the maximum number of model calls.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set how many model calls must happen before a text answer ends the loop.
    pub fn with_min_iterations(mut self, min: u32) -> Self {
        self.min_iterations = min;
        self
    }

    /// Set the max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Replace the built-in system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Drive the conversation until the model answers or the budget runs out.
    ///
    /// The conversation must already end with the user's prompt. Every model
    /// response and every tool result is appended to it, so on a provider
    /// error the messages produced so far are still there for the caller to
    /// persist.
    pub async fn process(
        &self,
        conversation: &mut Conversation,
    ) -> Result<LoopOutcome, agentbox_core::Error> {
        info!(
            conversation_id = %conversation.id,
            messages = conversation.messages.len(),
            "Processing conversation"
        );

        // Ensure system prompt is the first message; an existing one is kept
        if conversation.messages.first().map(|m| m.role) != Some(Role::System) {
            conversation.messages.insert(0, Message::system(&self.system_prompt));
        }

        let tool_definitions = self.dispatcher.definitions();
        let mut last_text: Option<String> = None;
        let mut tool_calls_made = 0;

        for iteration in 0..self.max_iterations {
            debug!(
                conversation_id = %conversation.id,
                iteration = iteration + 1,
                "Agent loop iteration"
            );

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = self.provider.complete(request).await.inspect_err(|e| {
                warn!(conversation_id = %conversation.id, error = %e, "Provider request failed");
            })?;

            let mut message = response.message;
            message.role = Role::Assistant;
            let tool_calls = message.tool_calls.clone();
            let text = message.has_text().then(|| message.text().to_string());

            self.event_bus.publish(DomainEvent::ResponseGenerated {
                conversation_id: conversation.id.to_string(),
                model: response.model,
                iteration: iteration + 1,
                tool_calls: tool_calls.len(),
                tokens_used: response.usage.map(|u| u.total_tokens),
                timestamp: Utc::now(),
            });

            if text.is_some() {
                last_text.clone_from(&text);
            }
            conversation.push(message);

            if tool_calls.is_empty() {
                match text {
                    Some(text) if iteration >= self.min_iterations => {
                        info!(
                            conversation_id = %conversation.id,
                            iterations = iteration + 1,
                            tool_calls = tool_calls_made,
                            "Final answer produced"
                        );
                        return Ok(LoopOutcome {
                            text: Some(text),
                            iterations: iteration + 1,
                            stop_reason: StopReason::FinalAnswer,
                            tool_calls: tool_calls_made,
                        });
                    }
                    Some(_) => debug!(
                        min_iterations = self.min_iterations,
                        "Text answer before minimum iterations, continuing"
                    ),
                    None => debug!("Empty model response, continuing"),
                }
                continue;
            }

            debug!(tool_count = tool_calls.len(), "Executing tool calls");

            // Strictly in order; one result message per call
            for call in &tool_calls {
                let result = self.dispatcher.dispatch_message(call).await;
                if !result.is_ok() {
                    debug!(tool = %call.name, error = %result.payload(), "Tool returned an error");
                }
                conversation.push(Message::tool_result(&call.id, &call.name, result.render()));
                tool_calls_made += 1;
            }
        }

        warn!(
            conversation_id = %conversation.id,
            iterations = self.max_iterations,
            "Max iterations reached without a final answer"
        );
        self.event_bus.publish(DomainEvent::IterationLimitReached {
            conversation_id: conversation.id.to_string(),
            iterations: self.max_iterations,
            timestamp: Utc::now(),
        });

        Ok(LoopOutcome {
            text: last_text,
            iterations: self.max_iterations,
            stop_reason: StopReason::IterationLimit,
            tool_calls: tool_calls_made,
        })
    }

    /// Run one prompt against the persisted conversation.
    ///
    /// Loads the history (a failing store counts as no history), appends the
    /// prompt, processes it and saves the result. The save happens on a
    /// provider failure too, before that error is returned.
    pub async fn run(
        &self,
        store: &dyn ConversationStore,
        prompt: &str,
    ) -> Result<LoopOutcome, agentbox_core::Error> {
        let history = match store.load().await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(store = store.name(), error = %e, "Failed to load history, starting fresh");
                Vec::new()
            }
        };
        debug!(store = store.name(), messages = history.len(), "History loaded");

        let mut conversation = Conversation::from_messages(history);
        conversation.push(Message::user(prompt));

        let outcome = self.process(&mut conversation).await;
        let saved = store.save(&conversation.messages).await;

        match (outcome, saved) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), saved) => {
                if let Err(save_err) = saved {
                    warn!(store = store.name(), error = %save_err, "Failed to save history after provider failure");
                }
                Err(e)
            }
        }
    }
}
