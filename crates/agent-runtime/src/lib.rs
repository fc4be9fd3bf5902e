//! Agent Runtime - resumable run execution
//!
//! This crate advances runs stored in a `relay_core::store::RunStore` one step
//! at a time, calling a completion provider for each assistant reply.

mod error;
mod openai;
mod provider;
mod runtime;

pub use error::{Result, RuntimeError};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::{
    prompt_history, Completion, CompletionProvider, CompletionRequest, PromptMessage, TokenUsage,
};
pub use runtime::AgentRuntime;
