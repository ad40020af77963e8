//! Fixed-size conversation memory for chat mode.

use std::collections::VecDeque;

use serde::Serialize;

use super::provider::ChatMessage;

/// One user turn and the assistant reply to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Sliding window over the most recent `capacity` exchanges.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    exchanges: VecDeque<Exchange>,
    capacity: usize,
}

impl ConversationWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            exchanges: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a completed exchange, evicting the oldest beyond capacity.
    pub fn push(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        if self.exchanges.len() == self.capacity {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            user: user.into(),
            assistant: assistant.into(),
        });
    }

    /// Flatten the window into alternating user/assistant messages, oldest first.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.exchanges()
            .flat_map(|e| {
                [
                    ChatMessage::user(e.user.as_str()),
                    ChatMessage::assistant(e.assistant.as_str()),
                ]
            })
            .collect()
    }

    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn keeps_only_the_most_recent_exchanges() {
        let mut window = ConversationWindow::new(5);
        for i in 0..7 {
            window.push(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(window.len(), 5);
        let users: Vec<&str> = window.exchanges().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["q2", "q3", "q4", "q5", "q6"]);
    }

    #[test]
    fn messages_alternate_user_then_assistant() {
        let mut window = ConversationWindow::new(5);
        window.push("hi", "hello");
        window.push("balance?", "I can help with that.");

        let messages = window.to_messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::user("hi"));
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[3].content, "I can help with that.");
    }

    #[test]
    fn zero_capacity_remembers_nothing() {
        let mut window = ConversationWindow::new(0);
        window.push("hi", "hello");
        assert!(window.is_empty());
        assert!(window.to_messages().is_empty());
    }
}
