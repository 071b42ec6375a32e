//! # agentbox Core
//!
//! Domain types, traits, and error definitions for the agentbox coding agent.
//! It defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is defined as a trait here:
//! the model boundary ([`Provider`]), the tools ([`Tool`]) and the conversation
//! persistence ([`ConversationStore`]). Implementations live in their
//! respective crates, and tests swap in scripted stand-ins.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod store;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, WorkingRoot};
pub use store::ConversationStore;
pub use event::{DomainEvent, EventBus};
