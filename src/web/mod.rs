//! Web surface: the single page, its form posts and the chat WebSocket.
//!
//! Every request resolves the caller's session from the `banking_session`
//! cookie, applies at most one handler, and the page is re-rendered from the
//! session alone.

pub mod render;
pub mod routes;
pub mod sessions;
pub mod ws;

pub use render::{PageOptions, Renderer};
pub use routes::{AppState, app_routes};
pub use sessions::{SESSION_COOKIE, SessionStore};

use std::sync::Arc;

use axum::Router;

use crate::config::AppConfig;
use crate::error::Error;
use crate::llm::{CompletionClient, LlmProvider, ResponseMode};

impl AppState {
    /// Wire a provider and configuration into shared handler state.
    pub fn from_config(config: &AppConfig, llm: Arc<dyn LlmProvider>) -> Result<Self, Error> {
        let mode = if config.streaming {
            ResponseMode::Streaming
        } else {
            ResponseMode::Whole
        };
        let client = CompletionClient::new(llm, config.system_prompt.as_str()).with_mode(mode);
        let options = PageOptions {
            streaming: config.streaming,
            show_rejections: config.show_rejections,
            ..PageOptions::default()
        };
        Ok(Self {
            sessions: Arc::new(SessionStore::new(
                config.history_window,
                config.session_idle_timeout,
            )),
            client: Arc::new(client),
            renderer: Arc::new(Renderer::new()?),
            options: Arc::new(options),
        })
    }
}

/// Build the full application router.
pub fn build_app(config: &AppConfig, llm: Arc<dyn LlmProvider>) -> Result<Router, Error> {
    Ok(app_routes(AppState::from_config(config, llm)?))
}
