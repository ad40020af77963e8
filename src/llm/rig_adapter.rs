//! Adapter from rig's `CompletionModel` to our `LlmProvider`.
//!
//! Our requests carry the whole conversation as role-tagged messages. rig
//! wants a preamble, a chat history and the prompt separately, so system
//! messages become the preamble and the final user turn becomes the prompt.

use async_trait::async_trait;
use futures::StreamExt;
use rig::completion::{
    AssistantContent, CompletionError, CompletionModel, CompletionRequestBuilder, Message,
};
use rig::streaming::StreamedAssistantContent;

use super::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role, TextStream,
};
use crate::error::LlmError;

/// Wraps any rig completion model.
pub struct RigAdapter<M> {
    provider: &'static str,
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(provider: &'static str, model: M, model_name: &str) -> Self {
        Self {
            provider,
            model,
            model_name: model_name.to_string(),
        }
    }

    fn request_builder(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionRequestBuilder<M>, LlmError> {
        let conversation = split_conversation(request.messages).map_err(|reason| {
            LlmError::RequestFailed {
                provider: self.provider.to_string(),
                reason,
            }
        })?;

        let history: Vec<Message> = conversation.history.into_iter().map(to_rig_message).collect();
        let mut builder = self
            .model
            .completion_request(Message::user(conversation.prompt))
            .messages(history);
        if let Some(preamble) = conversation.preamble {
            builder = builder.preamble(preamble);
        }
        Ok(builder)
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let response = self
            .request_builder(request)?
            .send()
            .await
            .map_err(|e| map_completion_error(self.provider, e))?;

        let content: String = response
            .choice
            .into_iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text),
                _ => None,
            })
            .collect();

        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError> {
        let stream = self
            .request_builder(request)?
            .stream()
            .await
            .map_err(|e| map_completion_error(self.provider, e))?;

        let provider = self.provider;
        Ok(Box::pin(stream.filter_map(move |item| async move {
            match item {
                Ok(StreamedAssistantContent::Text(text)) if !text.text.is_empty() => {
                    Some(Ok(text.text))
                }
                Ok(_) => None,
                Err(e) => Some(Err(map_completion_error(provider, e))),
            }
        })))
    }
}

/// A request reshaped for rig.
#[derive(Debug, PartialEq, Eq)]
struct Conversation {
    preamble: Option<String>,
    history: Vec<ChatMessage>,
    prompt: String,
}

fn split_conversation(messages: Vec<ChatMessage>) -> Result<Conversation, String> {
    let (system, mut turns): (Vec<ChatMessage>, Vec<ChatMessage>) = messages
        .into_iter()
        .partition(|m| m.role == Role::System);

    let prompt = match turns.pop() {
        Some(last) if last.role == Role::User => last.content,
        _ => return Err("request must end with a user turn".to_string()),
    };

    let preamble = (!system.is_empty()).then(|| {
        system
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n\n")
    });

    Ok(Conversation {
        preamble,
        history: turns,
        prompt,
    })
}

fn to_rig_message(message: ChatMessage) -> Message {
    match message.role {
        Role::Assistant => Message::assistant(message.content),
        Role::User | Role::System => Message::user(message.content),
    }
}

fn map_completion_error(provider: &str, err: CompletionError) -> LlmError {
    match err {
        CompletionError::JsonError(e) => LlmError::Json(e),
        CompletionError::ResponseError(reason) => LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason,
        },
        other => LlmError::RequestFailed {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}
