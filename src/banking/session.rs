//! Per-session state: wizard, message log, chat memory and transient notice.

use serde::Serialize;
use uuid::Uuid;

use super::account::Rejection;
use super::message::Message;
use super::wizard::{BankingMode, WizardState, WizardStep};
use crate::llm::ConversationWindow;

/// Everything one browser session owns. Handlers receive it by `&mut`.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    pub(crate) wizard: WizardState,
    messages: Vec<Message>,
    pub(crate) window: ConversationWindow,
    pub(crate) notice: Option<String>,
    pub(crate) rejection: Option<Rejection>,
}

impl Session {
    pub fn new(history_window: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            wizard: WizardState::Idle,
            messages: Vec::new(),
            window: ConversationWindow::new(history_window),
            notice: None,
            rejection: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> Option<BankingMode> {
        self.wizard.mode()
    }

    pub fn step(&self) -> Option<WizardStep> {
        self.wizard.step()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn window(&self) -> &ConversationWindow {
        &self.window
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// The most recent rejected submission, until the next successful one.
    pub fn rejection(&self) -> Option<Rejection> {
        self.rejection
    }

    /// Clear the notice once it has been shown.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn snapshot(&self) -> SessionSnapshot<'_> {
        SessionSnapshot {
            id: self.id,
            mode: self.mode(),
            step: self.step(),
            messages: &self.messages,
            notice: self.notice(),
            history_len: self.window.len(),
        }
    }
}

/// Read-only JSON view of a session.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot<'a> {
    pub id: Uuid,
    pub mode: Option<BankingMode>,
    pub step: Option<WizardStep>,
    pub messages: &'a [Message],
    pub notice: Option<&'a str>,
    pub history_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_is_idle_and_empty() {
        let session = Session::new(5);
        assert!(session.mode().is_none());
        assert!(session.step().is_none());
        assert!(session.messages().is_empty());
        assert!(session.notice().is_none());
        assert!(session.window().is_empty());
    }

    #[test]
    fn notice_is_taken_once() {
        let mut session = Session::new(5);
        session.notice = Some("Error getting response: boom".into());
        assert_eq!(session.take_notice().as_deref(), Some("Error getting response: boom"));
        assert!(session.take_notice().is_none());
    }

    #[test]
    fn snapshot_serializes_mode_and_step() {
        let mut session = Session::new(5);
        crate::banking::wizard::select_mode(&mut session, BankingMode::Account);
        let json = serde_json::to_value(session.snapshot()).unwrap();
        assert_eq!(json["mode"], "account");
        assert_eq!(json["step"], "name");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["messages"][0]["author"], "assistant");
    }
}
