//! Provider-agnostic request/response types and the `LlmProvider` trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single role-tagged message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A completion request: the full role-tagged conversation, system first.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}

/// A whole-string completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A finite stream of text fragments. Concatenating every `Ok` item in
/// arrival order yields the full response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A hosted language-model backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Request a whole-string completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Request an incremental completion.
    ///
    /// Providers without native streaming yield the whole response as a
    /// single fragment.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError> {
        let response = self.complete(request).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(response.content)
        })))
    }
}
