//! Chat completion provider trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// One message of a chat exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A single completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model name
    pub model: String,
    /// Conversation, system message first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Output length bound
    pub max_tokens: u32,
}

/// Trait for chat-completion based answer generation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI chat completions API (gpt-4o-mini)
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one completion and return the generated text
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
