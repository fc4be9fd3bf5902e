//! Agent definitions
//!
//! Definitions are never persisted: callers pass one on every invocation and
//! the runtime treats it as authoritative for that call.

mod definition;

pub use definition::{AgentDefinition, ToolDefinition};
