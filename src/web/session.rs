//! Session identification via an HTTP cookie.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use uuid::Uuid;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "career_session";

/// Mint a fresh session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// The session id from the request cookies, if present and well-formed.
///
/// Only UUIDs are accepted so clients cannot pick arbitrary store keys.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
        .map(|id| id.to_string())
}

/// `Set-Cookie` value for a session id.
pub fn session_cookie(session_id: &str) -> String {
    format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax")
}
