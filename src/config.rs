//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::LlmBackend;

pub const DEFAULT_PORT: u16 = 8080;
/// Number of prior user/assistant exchanges sent with each chat turn.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;
/// Sessions idle this long are dropped.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(3600); // 1 hour

/// System instruction sent ahead of every chat turn.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a Banking Assistant, a specialized AI chatbot designed to assist users with specific banking features. You can only help with and discuss the following services:

1. Financial Transactions:
- Deposits and withdrawals
- Bank account creation and management
- Transaction status checking

2. User Management:
- Agent creation and management

3. Complaint Management:
- Creating complaints
- Tracking complaint status
- Deleting complaints

Important Guidelines:
- Only provide information about the features listed above
- If asked about anything outside these services, politely explain that you can only assist with the listed features
- Always maintain a helpful and professional tone
- Suggest appropriate services based on user queries
- Guide users through the available options
- Never share sensitive account information
- Always clarify if you need more information to assist properly

Example responses:
- For account queries: \"I can help you create a new bank account or manage your existing one. Would you like to proceed with either of these?\"
- For transactions: \"I can assist you with deposits, withdrawals, or checking transaction status. Which service do you need?\"
- For complaints: \"I can help you create a new complaint, track an existing one, or delete a complaint. What would you like to do?\"

Remember: You are specifically designed to handle these banking services and should not provide information about other banking features or services.";

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// API key for the completion service.
    pub api_key: SecretString,
    /// Hosted completion service.
    pub backend: LlmBackend,
    /// Model name passed to the completion service.
    pub model: String,
    /// HTTP port for the page and WebSocket.
    pub port: u16,
    /// Stream fragments over the WebSocket instead of whole-string replies.
    pub streaming: bool,
    /// Exchanges kept in the chat memory window.
    pub history_window: usize,
    pub system_prompt: String,
    /// Render feedback when a wizard step rejects a submission.
    pub show_rejections: bool,
    /// Session idle timeout (sessions are pruned after this duration).
    pub session_idle_timeout: Duration,
    /// Optional directory for daily-rolled log files.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match get("BANKING_ASSIST_BACKEND") {
            Some(raw) => raw
                .parse::<LlmBackend>()
                .map_err(|message| ConfigError::InvalidValue {
                    key: "BANKING_ASSIST_BACKEND".to_string(),
                    message,
                })?,
            None => LlmBackend::Groq,
        };

        let key_var = backend.api_key_var();
        let api_key = get(key_var)
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(key_var.to_string()))?;

        let port = match get("BANKING_ASSIST_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "BANKING_ASSIST_PORT".to_string(),
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let history_window = match get("BANKING_ASSIST_HISTORY_WINDOW") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                key: "BANKING_ASSIST_HISTORY_WINDOW".to_string(),
                message: e.to_string(),
            })?,
            None => DEFAULT_HISTORY_WINDOW,
        };

        let streaming = match get("BANKING_ASSIST_STREAMING") {
            Some(raw) => parse_bool("BANKING_ASSIST_STREAMING", &raw)?,
            None => true,
        };

        let show_rejections = match get("BANKING_ASSIST_SHOW_REJECTIONS") {
            Some(raw) => parse_bool("BANKING_ASSIST_SHOW_REJECTIONS", &raw)?,
            None => false,
        };

        let session_idle_timeout = match get("BANKING_ASSIST_SESSION_IDLE_MINUTES") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(minutes) if minutes > 0 => Duration::from_secs(minutes * 60),
                Ok(_) => {
                    return Err(ConfigError::InvalidValue {
                        key: "BANKING_ASSIST_SESSION_IDLE_MINUTES".to_string(),
                        message: "must be at least 1".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::InvalidValue {
                        key: "BANKING_ASSIST_SESSION_IDLE_MINUTES".to_string(),
                        message: e.to_string(),
                    });
                }
            },
            None => DEFAULT_SESSION_IDLE_TIMEOUT,
        };

        Ok(Self {
            api_key,
            backend,
            model: get("BANKING_ASSIST_MODEL")
                .unwrap_or_else(|| backend.default_model().to_string()),
            port,
            streaming,
            history_window,
            system_prompt: get("BANKING_ASSIST_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            show_rejections,
            session_idle_timeout,
            log_dir: get("BANKING_ASSIST_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
