//! Completion provider capability
//!
//! The runtime only needs "generate a reply for this history with this
//! model". Token usage is optional metadata.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use relay_core::run::{Message, MessageRole};

use crate::error::Result;

/// One entry of the history sent to the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for PromptMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Project a run's messages onto the roles a provider accepts
pub fn prompt_history(messages: &[Message]) -> Vec<PromptMessage> {
    messages
        .iter()
        .filter(|m| m.role.is_prompt_role())
        .map(PromptMessage::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// First choice text; empty when the provider returned none
    pub content: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }
}

/// Something that turns a message history into a single reply
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Tag recorded in each step's model-call descriptor
    fn provider_tag(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}
