//! Integration tests for the banking page, its form posts and the chat socket.
//!
//! Each test spins up an Axum server on a random port with a scripted LLM,
//! then drives it over real HTTP and WebSocket connections.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

use banking_assist::config::AppConfig;
use banking_assist::error::LlmError;
use banking_assist::llm::{
    CompletionRequest, CompletionResponse, LlmBackend, LlmProvider, TextStream,
};
use banking_assist::web::{SESSION_COOKIE, build_app};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub LLM provider for integration tests (no real API calls).
struct StubLlm {
    fragments: Vec<&'static str>,
    fail: bool,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.fail {
            return Err(upstream_unavailable());
        }
        Ok(CompletionResponse {
            content: self.fragments.concat(),
            input_tokens: 0,
            output_tokens: 0,
        })
    }

    async fn complete_stream(&self, _request: CompletionRequest) -> Result<TextStream, LlmError> {
        if self.fail {
            return Err(upstream_unavailable());
        }
        let fragments: Vec<Result<String, LlmError>> =
            self.fragments.iter().map(|f| Ok(f.to_string())).collect();
        Ok(Box::pin(futures_util::stream::iter(fragments)))
    }
}

fn upstream_unavailable() -> LlmError {
    LlmError::RequestFailed {
        provider: "stub".to_string(),
        reason: "upstream unavailable".to_string(),
    }
}

fn chat_frame(content: &str) -> String {
    serde_json::json!({ "type": "message", "content": content }).to_string()
}

fn test_config(streaming: bool) -> AppConfig {
    AppConfig {
        api_key: SecretString::from("test-key".to_string()),
        backend: LlmBackend::Groq,
        model: "stub".to_string(),
        port: 0,
        streaming,
        history_window: 5,
        system_prompt: "You are a test assistant.".to_string(),
        show_rejections: false,
        session_idle_timeout: Duration::from_secs(3600),
        log_dir: None,
    }
}

/// Start an Axum server on a random port, return the port.
async fn start_server(llm: StubLlm, streaming: bool) -> u16 {
    let app = build_app(&test_config(streaming), Arc::new(llm)).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    port
}

fn replying(fragments: Vec<&'static str>) -> StubLlm {
    StubLlm {
        fragments,
        fail: false,
    }
}

fn failing() -> StubLlm {
    StubLlm {
        fragments: Vec::new(),
        fail: true,
    }
}

/// A browser-like client: no redirect following, cookie carried by hand.
struct Browser {
    http: reqwest::Client,
    base: String,
    cookie: String,
}

impl Browser {
    /// Load the page once to obtain a session cookie.
    async fn open(port: u16) -> Self {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let base = format!("http://127.0.0.1:{port}");
        let resp = http.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let set_cookie = resp
            .headers()
            .get(reqwest::header::SET_COOKIE)
            .expect("first visit issues a session cookie")
            .to_str()
            .unwrap();
        let cookie = set_cookie.split(';').next().unwrap().to_string();
        assert!(cookie.starts_with(SESSION_COOKIE));
        Self { http, base, cookie }
    }

    async fn page(&self) -> String {
        let resp = self
            .http
            .get(format!("{}/", self.base))
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(reqwest::header::SET_COOKIE).is_none());
        resp.text().await.unwrap()
    }

    async fn post(&self, path: &str, form: &[(&str, &str)]) {
        let resp = self
            .http
            .post(format!("{}{path}", self.base))
            .header(reqwest::header::COOKIE, &self.cookie)
            .form(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "POST {path}");
    }

    async fn snapshot(&self) -> Value {
        self.http
            .get(format!("{}/api/session", self.base))
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

// ── Page Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), false).await;
        let resp = reqwest::get(format!("http://127.0.0.1:{port}/health"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json: Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn fresh_visit_shows_menu() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), false).await;
        let browser = Browser::open(port).await;
        let html = browser.page().await;
        assert!(html.contains("id=\"panel-menu\""));
        assert!(!html.contains("id=\"back\""));

        let snapshot = browser.snapshot().await;
        assert!(snapshot["mode"].is_null());
        assert!(snapshot["messages"].as_array().unwrap().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn account_creation_end_to_end() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), false).await;
        let browser = Browser::open(port).await;

        browser.post("/mode/account", &[]).await;
        assert!(browser.page().await.contains("panel-account-name"));

        browser.post("/account/name", &[("name", "Alice")]).await;
        browser
            .post("/account/email", &[("email", "alice@example.com")])
            .await;
        browser
            .post(
                "/account/bank-details",
                &[
                    ("bank_id", "B1"),
                    ("daily_limit", "5000"),
                    ("ifsc_code", "IFSC01"),
                    ("upi_id", "alice@upi"),
                    ("login_id", "alice-login"),
                    ("agent_id", "AG7"),
                ],
            )
            .await;
        browser
            .post(
                "/account/security",
                &[
                    ("username", "alice"),
                    ("password", "s3cret"),
                    ("trxn_password", "t3cret"),
                    ("otp_access", "on"),
                ],
            )
            .await;

        let html = browser.page().await;
        assert!(html.contains("Account created successfully!"));
        for expected in [
            "Alice",
            "alice@example.com",
            "5000.00",
            "IFSC01",
            "alice@upi",
            "Login ID: alice-login",
        ] {
            assert!(html.contains(expected), "page missing {expected}");
        }
        assert!(!html.contains("s3cret"));
        assert!(html.contains("id=\"panel-menu\""));

        let snapshot = browser.snapshot().await;
        assert!(snapshot["mode"].is_null());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_email_keeps_email_step() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), false).await;
        let browser = Browser::open(port).await;

        browser.post("/mode/account", &[]).await;
        browser.post("/account/name", &[("name", "Alice")]).await;
        let before = browser.snapshot().await["messages"]
            .as_array()
            .unwrap()
            .len();

        browser.post("/account/email", &[("email", "not-an-email")]).await;
        let html = browser.page().await;
        assert!(html.contains("panel-account-email"));
        assert!(!html.contains("id=\"rejection\""));

        let snapshot = browser.snapshot().await;
        assert_eq!(snapshot["step"], "email");
        assert_eq!(snapshot["messages"].as_array().unwrap().len(), before);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn deposit_end_to_end() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), false).await;
        let browser = Browser::open(port).await;

        browser.post("/mode/transaction", &[]).await;
        assert!(browser.page().await.contains("panel-transaction-kind"));

        browser.post("/transaction/deposit", &[]).await;
        assert!(browser.page().await.contains("panel-transaction-amount"));

        browser.post("/transaction/amount", &[("amount", "250")]).await;
        let html = browser.page().await;
        assert!(html.contains("Transaction successful!"));
        assert!(html.contains("Type: Deposit"));
        assert!(html.contains("250.00"));
        assert!(html.contains("id=\"panel-menu\""));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_mode_is_not_found() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), false).await;
        let browser = Browser::open(port).await;
        let resp = browser
            .http
            .post(format!("{}/mode/loans", browser.base))
            .header(reqwest::header::COOKIE, &browser.cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(browser.snapshot().await["mode"].is_null());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn back_returns_to_menu() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), false).await;
        let browser = Browser::open(port).await;

        browser.post("/mode/account", &[]).await;
        browser.post("/account/name", &[("name", "Alice")]).await;
        browser.post("/back", &[]).await;

        let html = browser.page().await;
        assert!(html.contains("id=\"panel-menu\""));
        assert!(!html.contains("panel-account-email"));

        // Re-entering starts a fresh draft.
        browser.post("/mode/account", &[]).await;
        assert_eq!(browser.snapshot().await["step"], "name");
    })
    .await
    .expect("test timed out");
}

// ── Chat Tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn chat_turn_appends_both_messages() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["You can deposit at any branch."]), false).await;
        let browser = Browser::open(port).await;

        browser.post("/mode/chat", &[]).await;
        browser.post("/chat", &[("message", "How do I deposit?")]).await;

        let snapshot = browser.snapshot().await;
        let messages = snapshot["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"], "How do I deposit?");
        assert_eq!(messages[2]["content"], "You can deposit at any branch.");
        assert_eq!(snapshot["history_len"], 1);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn chat_failure_shows_notice_once() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(failing(), false).await;
        let browser = Browser::open(port).await;

        browser.post("/mode/chat", &[]).await;
        browser.post("/chat", &[("message", "hello")]).await;

        let snapshot = browser.snapshot().await;
        assert_eq!(snapshot["messages"].as_array().unwrap().len(), 1);
        assert_eq!(snapshot["history_len"], 0);

        let html = browser.page().await;
        assert!(html.contains("id=\"notice\""));
        assert!(html.contains("Error getting response"));

        let again = browser.page().await;
        assert!(!again.contains("id=\"notice\""));
    })
    .await
    .expect("test timed out");
}

// ── WebSocket Tests ──────────────────────────────────────────────────

#[tokio::test]
async fn ws_streams_chunks_then_done() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["Hel", "lo ", "there"]), true).await;
        let browser = Browser::open(port).await;
        browser.post("/mode/chat", &[]).await;

        let mut request = format!("ws://127.0.0.1:{port}/ws/chat")
            .into_client_request()
            .unwrap();
        request
            .headers_mut()
            .insert("cookie", browser.cookie.parse().unwrap());
        let (mut ws, _) = connect_async(request).await.expect("WS connect failed");

        ws.send(Message::Text(chat_frame("hi").into())).await.unwrap();

        let mut chunks = Vec::new();
        loop {
            let msg = ws.next().await.unwrap().unwrap();
            let json = parse_ws_json(&msg);
            match json["type"].as_str().unwrap() {
                "stream_chunk" => chunks.push(json["content"].as_str().unwrap().to_string()),
                "done" => {
                    assert_eq!(json["content"], "Hello there");
                    break;
                }
                other => panic!("unexpected frame {other}"),
            }
        }
        assert_eq!(chunks, vec!["Hel", "lo ", "there"]);

        let snapshot = browser.snapshot().await;
        let messages = snapshot["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["content"], "Hello there");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_outside_chat_mode_is_ignored() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["unused"]), true).await;
        let browser = Browser::open(port).await;

        let mut request = format!("ws://127.0.0.1:{port}/ws/chat")
            .into_client_request()
            .unwrap();
        request
            .headers_mut()
            .insert("cookie", browser.cookie.parse().unwrap());
        let (mut ws, _) = connect_async(request).await.unwrap();

        ws.send(Message::Text(chat_frame("hi").into())).await.unwrap();
        let json = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(json["type"], "ignored");
        assert!(browser.snapshot().await["messages"]
            .as_array()
            .unwrap()
            .is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_failure_sends_error_frame() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(failing(), true).await;
        let browser = Browser::open(port).await;
        browser.post("/mode/chat", &[]).await;

        let mut request = format!("ws://127.0.0.1:{port}/ws/chat")
            .into_client_request()
            .unwrap();
        request
            .headers_mut()
            .insert("cookie", browser.cookie.parse().unwrap());
        let (mut ws, _) = connect_async(request).await.unwrap();

        ws.send(Message::Text(chat_frame("hi").into())).await.unwrap();
        let json = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(json["type"], "error");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("Error getting response"));
        assert_eq!(
            browser.snapshot().await["messages"].as_array().unwrap().len(),
            1
        );
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn ws_without_session_is_rejected() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server(replying(vec!["ok"]), true).await;
        let result = connect_async(format!("ws://127.0.0.1:{port}/ws/chat")).await;
        assert!(result.is_err(), "socket without a session cookie must be refused");
    })
    .await
    .expect("test timed out");
}
