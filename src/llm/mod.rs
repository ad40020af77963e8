//! LLM integration for Banking Assist.
//!
//! Supports:
//! - **Groq**: the default hosted backend
//! - **OpenAI**: Direct API access
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait.
//! `CompletionClient` layers the assistant's system prompt and the rolling
//! conversation window on top of a provider.

pub mod completion;
pub mod provider;
mod rig_adapter;
pub mod window;

pub use completion::{CompletionClient, ResponseMode, drain};
pub use provider::*;
pub use rig_adapter::RigAdapter;
pub use window::{ConversationWindow, Exchange};

use std::sync::Arc;

use rig::client::CompletionClient as _;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Groq,
    OpenAi,
}

impl LlmBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::OpenAi => "openai",
        }
    }

    /// Environment variable holding this backend's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Groq => "GROQ_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Groq => "llama3-8b-8192",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for LlmBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("Unknown backend: {}", other)),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.backend {
        LlmBackend::Groq => create_groq_provider(config),
        LlmBackend::OpenAi => create_openai_provider(config),
    }
}

fn create_groq_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::groq;

    let client: groq::Client =
        groq::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "groq".to_string(),
                reason: format!("Failed to create Groq client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Groq (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new("groq", model, &config.model)))
}

fn create_openai_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            LlmError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigAdapter::new("openai", model, &config.model)))
}
