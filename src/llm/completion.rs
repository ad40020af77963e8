//! Completion adapter: fixed system instruction plus a rolling window of
//! prior exchanges, answered as a stream of text fragments.

use std::sync::Arc;

use futures::StreamExt;
use tracing::debug;

use super::provider::{ChatMessage, CompletionRequest, LlmProvider, TextStream};
use super::window::ConversationWindow;
use crate::error::LlmError;

/// How the provider is asked to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// One request, one string. Surfaced as a single-fragment stream.
    Whole,
    /// Incremental fragments as the provider produces them.
    Streaming,
}

/// Wraps an `LlmProvider` with the assistant's system instruction.
pub struct CompletionClient {
    llm: Arc<dyn LlmProvider>,
    system_prompt: String,
    mode: ResponseMode,
}

impl CompletionClient {
    pub fn new(llm: Arc<dyn LlmProvider>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
            mode: ResponseMode::Whole,
        }
    }

    pub fn with_mode(mut self, mode: ResponseMode) -> Self {
        self.mode = mode;
        self
    }

    /// `[system, (user, assistant)*, user]`
    pub fn build_request(&self, window: &ConversationWindow, user_input: &str) -> CompletionRequest {
        let mut messages = Vec::with_capacity(window.len() * 2 + 2);
        messages.push(ChatMessage::system(self.system_prompt.as_str()));
        messages.extend(window.to_messages());
        messages.push(ChatMessage::user(user_input));
        CompletionRequest::new(messages)
    }

    /// Open a fragment stream for the next user turn.
    pub async fn stream(
        &self,
        window: &ConversationWindow,
        user_input: &str,
    ) -> Result<TextStream, LlmError> {
        let request = self.build_request(window, user_input);
        match self.mode {
            ResponseMode::Whole => {
                let response = self.llm.complete(request).await?;
                debug!(
                    model = self.llm.model_name(),
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Completion received"
                );
                Ok(Box::pin(futures::stream::once(async move {
                    Ok(response.content)
                })))
            }
            ResponseMode::Streaming => self.llm.complete_stream(request).await,
        }
    }

    /// Request a reply and drain it into one string.
    pub async fn respond(
        &self,
        window: &ConversationWindow,
        user_input: &str,
    ) -> Result<String, LlmError> {
        let stream = self.stream(window, user_input).await?;
        drain(stream).await
    }
}

/// Concatenate every fragment in arrival order. The first error aborts.
pub async fn drain(mut stream: TextStream) -> Result<String, LlmError> {
    let mut full = String::new();
    while let Some(fragment) = stream.next().await {
        full.push_str(&fragment?);
    }
    Ok(full)
}
