//! LLM Provider implementations for agentbox.
//!
//! All providers implement the `agentbox_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
