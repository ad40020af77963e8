//! Page rendering: a pure function of the session.

use minijinja::Environment;
use serde::Serialize;

use crate::banking::{BankingMode, Message, Session};
use crate::error::RenderError;

const PAGE_TEMPLATE: &str = include_str!("templates/page.html");
const PAGE_NAME: &str = "page.html";

/// Static options that shape the page.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    /// Submit chat turns over the WebSocket and show fragments as they arrive.
    pub streaming: bool,
    /// Show why a wizard step rejected the last submission.
    pub show_rejections: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "Banking Assistant".to_string(),
            streaming: false,
            show_rejections: false,
        }
    }
}

#[derive(Serialize)]
struct MessageView<'a> {
    label: &'static str,
    class: &'static str,
    content: &'a str,
    timestamp: String,
}

impl<'a> From<&'a Message> for MessageView<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            label: message.author.label(),
            class: if message.is_user() {
                "user-message"
            } else {
                "assistant-message"
            },
            content: &message.content,
            timestamp: message.timestamp(),
        }
    }
}

#[derive(Serialize)]
struct PageView<'a> {
    title: &'a str,
    messages: Vec<MessageView<'a>>,
    notice: Option<&'a str>,
    rejection: Option<&'static str>,
    /// Exactly one of `menu`, `chat`, `account`, `transaction`.
    panel: &'static str,
    step: Option<&'static str>,
    streaming: bool,
}

impl<'a> PageView<'a> {
    fn build(session: &'a Session, options: &'a PageOptions) -> Self {
        let panel = match session.mode() {
            None => "menu",
            Some(BankingMode::Chat) => "chat",
            Some(BankingMode::Account) => "account",
            Some(BankingMode::Transaction) => "transaction",
        };
        Self {
            title: &options.title,
            messages: session.messages().iter().map(MessageView::from).collect(),
            notice: session.notice(),
            rejection: options
                .show_rejections
                .then(|| session.rejection().map(|r| r.reason))
                .flatten(),
            panel,
            step: session.step().map(|s| s.as_str()),
            streaming: options.streaming,
        }
    }
}

/// Holds the compiled page template.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template(PAGE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, session: &Session, options: &PageOptions) -> Result<String, RenderError> {
        let view = PageView::build(session, options);
        let template = self.env.get_template(PAGE_NAME)?;
        Ok(template.render(&view)?)
    }
}
