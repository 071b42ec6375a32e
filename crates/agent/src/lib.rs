//! The agent loop: the heart of agentbox.
//!
//! The agent follows a **request → dispatch → observe** cycle:
//!
//! 1. **Receive** the user's prompt (appended to any saved history)
//! 2. **Send to LLM** with the full conversation and the tool schemas
//! 3. **If tool calls**: dispatch them in order, append one result each, go to 2
//! 4. **If text**: that is the answer
//!
//! The loop continues until the model answers with text only (and the minimum
//! number of iterations has passed) or the iteration budget runs out.

pub mod loop_runner;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::{AgentLoop, LoopOutcome, StopReason};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
