//! LLM chat model abstraction.
//!
//! The support assistant only needs single-shot completions: a conversation
//! goes in, one assistant reply comes out. [`ChatModel`] is the seam the
//! assistant is written against, and [`ChatCompletionsDriver`] is the
//! production implementation for any `OpenAI`-compatible endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use guardrail_support_desk::llm::{ChatCompletionsDriver, LlmSettings, Message};
//!
//! let driver = ChatCompletionsDriver::new(settings)?;
//! let reply = driver.complete(&[Message::user("Hello")]).await?;
//! ```

pub mod chat_completions;
pub mod provider;

pub use chat_completions::ChatCompletionsDriver;
pub use provider::Provider;

use std::time::Duration;

use thiserror::Error;

/// LLM connection and model settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o-mini`).
    pub model: String,
    /// Provider type (auto-detected from `base_url`).
    pub provider: Provider,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on completion tokens.
    pub max_tokens: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Errors raised while talking to the model endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("LLM endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned.
        body: String,
    },

    /// The completion carried no assistant text.
    #[error("LLM response contained no message content")]
    EmptyResponse,
}

/// A model that turns a conversation into a single assistant reply.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply is empty.
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}
