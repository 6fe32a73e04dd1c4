//! HTTP surface: landing page, chat endpoint, and session management.

pub mod routes;
pub mod session;

pub use routes::{AppState, chat_routes};
pub use session::{SESSION_COOKIE, new_session_id, session_cookie, session_id_from_headers};
