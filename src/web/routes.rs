//! Axum routes for the chat page and API.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use super::session::{new_session_id, session_cookie, session_id_from_headers};
use crate::error::ChatError;
use crate::interview::ChatService;

const INDEX_HTML: &str = include_str!("index.html");

/// Reply body when the request carries no usable message.
pub const NO_MESSAGE_RESPONSE: &str = "No message received.";

/// Reply body when the session store fails.
pub const STORE_FAILURE_RESPONSE: &str =
    "Sorry, something went wrong saving your conversation. Please try again.";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
}

/// Build the Axum router with the chat page, chat API, and session routes.
pub fn chat_routes(chat: Arc<ChatService>) -> Router {
    let state = AppState { chat };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/", get(index))
        .route("/chat", post(chat_turn))
        .route("/reset", post(reset_session))
        .route("/api/session", get(session_status).delete(end_session))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the session id, minting one (and a cookie to carry it) if absent.
fn resolve_session(headers: &HeaderMap) -> (String, Option<String>) {
    match session_id_from_headers(headers) {
        Some(id) => (id, None),
        None => {
            let id = new_session_id();
            let cookie = session_cookie(&id);
            (id, Some(cookie))
        }
    }
}

fn with_cookie(mut response: Response, cookie: Option<String>) -> Response {
    if let Some(cookie) = cookie {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "career-assist"
    }))
}

// ── Page ────────────────────────────────────────────────────────────────

/// GET /
///
/// Landing on the page always starts a fresh conversation.
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session_id, _) = resolve_session(&headers);
    if let Err(e) = state.chat.reset(&session_id).await {
        error!(error = %e, "Failed to reset session on landing");
        return (StatusCode::INTERNAL_SERVER_ERROR, STORE_FAILURE_RESPONSE).into_response();
    }
    // Always re-issue the cookie so its lifetime restarts with the session.
    with_cookie(Html(INDEX_HTML).into_response(), Some(session_cookie(&session_id)))
}

// ── Chat ────────────────────────────────────────────────────────────────

/// POST /chat
///
/// `{"message": "..."}` → `{"response": "..."}`. A missing, malformed, or
/// blank message is a 400 and leaves the session untouched.
async fn chat_turn(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let message = match payload {
        Ok(Json(ChatRequest {
            message: Some(message),
        })) => message,
        Ok(_) => String::new(),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected chat payload");
            String::new()
        }
    };

    let (session_id, cookie) = resolve_session(&headers);
    let response = match state.chat.submit(&session_id, &message).await {
        Ok(outcome) => Json(ChatResponse {
            response: outcome.response,
        })
        .into_response(),
        Err(ChatError::EmptyMessage) => (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse {
                response: NO_MESSAGE_RESPONSE.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(session = %session_id, error = %e, "Chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse {
                    response: STORE_FAILURE_RESPONSE.to_string(),
                }),
            )
                .into_response()
        }
    };
    with_cookie(response, cookie)
}

// ── Session management ──────────────────────────────────────────────────

/// POST /reset
async fn reset_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (session_id, cookie) = resolve_session(&headers);
    let response = match state.chat.reset(&session_id).await {
        Ok(()) => Json(serde_json::json!({"status": "reset"})).into_response(),
        Err(e) => {
            error!(session = %session_id, error = %e, "Session reset failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };
    with_cookie(response, cookie)
}

/// GET /api/session
///
/// Returns the caller's interview progress, or 404 if there is no session.
async fn session_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id_from_headers(&headers) else {
        return not_found();
    };
    match state.chat.status(&session_id).await {
        Ok(Some(status)) => Json(status).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            error!(session = %session_id, error = %e, "Session status failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// DELETE /api/session
async fn end_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(session_id) = session_id_from_headers(&headers) else {
        return Json(serde_json::json!({"deleted": false})).into_response();
    };
    match state.chat.end(&session_id).await {
        Ok(deleted) => Json(serde_json::json!({"deleted": deleted})).into_response(),
        Err(e) => {
            error!(session = %session_id, error = %e, "Session delete failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "No session exists yet"})),
    )
        .into_response()
}
