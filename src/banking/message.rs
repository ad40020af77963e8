//! Chat log entries shown on the page.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    /// Label rendered in front of the message.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
        }
    }
}

/// One entry of the session's message log. Never mutated once appended.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub content: String,
    pub author: Author,
    pub created_at: DateTime<Local>,
}

impl Message {
    pub fn new(content: impl Into<String>, author: Author) -> Self {
        Self {
            content: content.into(),
            author,
            created_at: Local::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Author::User)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Author::Assistant)
    }

    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }

    /// `HH:MM` in local time.
    pub fn timestamp(&self) -> String {
        self.created_at.format("%H:%M").to_string()
    }
}
