//! Chat mode: one user turn in, one assistant turn out.
//!
//! A turn is recorded only once the full reply is in hand: the user message,
//! the assistant message and the memory-window exchange are appended together.
//! A failed call records nothing and leaves a notice for the next render.

use tracing::{info, warn};

use super::message::Message;
use super::session::Session;
use super::wizard::BankingMode;
use crate::error::LlmError;
use crate::llm::CompletionClient;

/// Prefix of the notice shown when the completion call fails.
pub const ERROR_NOTICE_PREFIX: &str = "Error getting response";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Both turns were appended; carries the assistant reply.
    Replied(String),
    /// The call failed; carries the notice shown to the user.
    Failed(String),
    /// Blank input or not in chat mode.
    Ignored,
}

/// Normalized user input, or `None` if the turn should be ignored.
pub fn accept_input<'a>(session: &Session, input: &'a str) -> Option<&'a str> {
    if session.mode() != Some(BankingMode::Chat) {
        return None;
    }
    let input = input.trim();
    (!input.is_empty()).then_some(input)
}

/// Run a whole chat turn against the completion client.
pub async fn send_chat(session: &mut Session, client: &CompletionClient, input: &str) -> ChatOutcome {
    let Some(input) = accept_input(session, input) else {
        return ChatOutcome::Ignored;
    };

    match client.respond(session.window(), input).await {
        Ok(reply) => record_exchange(session, input, reply),
        Err(e) => record_failure(session, &e),
    }
}

/// Append a completed exchange to the log and the memory window.
pub fn record_exchange(session: &mut Session, input: &str, reply: String) -> ChatOutcome {
    session.notice = None;
    session.push_message(Message::user(input));
    session.push_message(Message::assistant(reply.as_str()));
    session.window.push(input, reply.as_str());
    info!(
        session = %session.id(),
        reply_len = reply.len(),
        history = session.window.len(),
        "Chat turn recorded"
    );
    ChatOutcome::Replied(reply)
}

/// Surface a failed call as a notice without touching the log.
pub fn record_failure(session: &mut Session, error: &LlmError) -> ChatOutcome {
    warn!(session = %session.id(), error = %error, "Completion call failed");
    let notice = format!("{ERROR_NOTICE_PREFIX}: {error}");
    session.notice = Some(notice.clone());
    ChatOutcome::Failed(notice)
}
