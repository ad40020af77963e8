//! HTTP routes: one page plus the form posts that mutate the session.

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use super::render::{PageOptions, Renderer};
use super::sessions::{ResolvedSession, SessionStore, session_cookie, session_id_from_headers};
use super::ws::ws_chat_handler;
use crate::banking::{
    AmountForm, BankDetailsForm, BankingMode, SecurityForm, Session, TransactionKind, chat,
    wizard,
};
use crate::llm::CompletionClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub client: Arc<CompletionClient>,
    pub renderer: Arc<Renderer>,
    pub options: Arc<PageOptions>,
}

/// Build the Axum router for the page, form posts and chat WebSocket.
pub fn app_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/session", get(session_snapshot))
        .route("/mode/{mode}", post(select_mode))
        .route("/back", post(back_to_menu))
        .route("/account/name", post(account_name))
        .route("/account/email", post(account_email))
        .route("/account/bank-details", post(account_bank_details))
        .route("/account/security", post(account_security))
        .route("/transaction/amount", post(transaction_amount))
        .route("/transaction/{kind}", post(transaction_kind))
        .route("/chat", post(chat_turn))
        .route("/ws/chat", get(ws_chat_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// ── Helpers ─────────────────────────────────────────────────────────────

async fn resolve(state: &AppState, headers: &HeaderMap) -> ResolvedSession {
    state
        .sessions
        .resolve(session_id_from_headers(headers))
        .await
}

fn with_cookie(mut response: Response, resolved: &ResolvedSession) -> Response {
    if resolved.created {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(resolved.id)) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// Apply one mutation to the caller's session and send the browser back to
/// the page for a full re-render.
async fn mutate<F>(state: &AppState, headers: &HeaderMap, apply: F) -> Response
where
    F: FnOnce(&mut Session),
{
    let resolved = resolve(state, headers).await;
    {
        let mut session = resolved.session.lock().await;
        apply(&mut session);
    }
    with_cookie(Redirect::to("/").into_response(), &resolved)
}

// ── Page ────────────────────────────────────────────────────────────────

async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolved = resolve(&state, &headers).await;
    let mut session = resolved.session.lock().await;

    let response = match state.renderer.render(&session, &state.options) {
        Ok(body) => {
            // Notice and rejection feedback are shown once.
            session.take_notice();
            session.rejection = None;
            Html(body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    };
    drop(session);
    with_cookie(response, &resolved)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "banking-assist"
    }))
}

async fn session_snapshot(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolved = resolve(&state, &headers).await;
    let session = resolved.session.lock().await;
    let response = Json(session.snapshot()).into_response();
    drop(session);
    with_cookie(response, &resolved)
}

// ── Mode selection ──────────────────────────────────────────────────────

async fn select_mode(
    State(state): State<AppState>,
    Path(mode): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mode = match mode.parse::<BankingMode>() {
        Ok(mode) => mode,
        Err(e) => {
            debug!(error = %e, "Rejected mode selection");
            return (StatusCode::NOT_FOUND, e).into_response();
        }
    };
    mutate(&state, &headers, |session| {
        wizard::select_mode(session, mode);
    })
    .await
}

async fn back_to_menu(State(state): State<AppState>, headers: HeaderMap) -> Response {
    mutate(&state, &headers, wizard::back_to_menu).await
}

// ── Account wizard ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NameForm {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct EmailForm {
    #[serde(default)]
    email: String,
}

async fn account_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<NameForm>,
) -> Response {
    mutate(&state, &headers, |session| {
        wizard::submit_name(session, &form.name);
    })
    .await
}

async fn account_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<EmailForm>,
) -> Response {
    mutate(&state, &headers, |session| {
        wizard::submit_email(session, &form.email);
    })
    .await
}

async fn account_bank_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<BankDetailsForm>,
) -> Response {
    mutate(&state, &headers, |session| {
        wizard::submit_bank_details(session, &form);
    })
    .await
}

async fn account_security(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<SecurityForm>,
) -> Response {
    mutate(&state, &headers, |session| {
        wizard::submit_security(session, &form);
    })
    .await
}

// ── Transaction wizard ──────────────────────────────────────────────────

async fn transaction_kind(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    headers: HeaderMap,
) -> Response {
    let kind = match kind.parse::<TransactionKind>() {
        Ok(kind) => kind,
        Err(e) => return (StatusCode::NOT_FOUND, e).into_response(),
    };
    mutate(&state, &headers, |session| {
        wizard::select_transaction_kind(session, kind);
    })
    .await
}

async fn transaction_amount(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<AmountForm>,
) -> Response {
    mutate(&state, &headers, |session| {
        wizard::submit_amount(session, &form.amount);
    })
    .await
}

// ── Chat ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

/// Whole-string chat turn. Holds the session for the duration of the call.
async fn chat_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let resolved = resolve(&state, &headers).await;
    {
        let mut session = resolved.session.lock().await;
        chat::send_chat(&mut session, &state.client, &form.message).await;
    }
    with_cookie(Redirect::to("/").into_response(), &resolved)
}
