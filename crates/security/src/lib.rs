//! Security module for agentbox: filesystem containment.
//!
//! Provides:
//! - **Path resolution**: every path a tool touches is resolved against the
//!   working root and rejected if its canonical form leaves that root

pub mod path;

pub use path::{resolve, PathValidationError};
