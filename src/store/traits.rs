//! `SessionStore` trait: keyed persistence for interview sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::interview::state::Session;

/// Backend-agnostic session persistence, keyed by client session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session, or `None` if the key is unknown.
    async fn load(&self, session_id: &str) -> Result<Option<Session>, DatabaseError>;

    /// Insert or replace a session.
    async fn save(&self, session_id: &str, session: &Session) -> Result<(), DatabaseError>;

    /// Delete a session. Returns whether it existed.
    async fn delete(&self, session_id: &str) -> Result<bool, DatabaseError>;

    /// Delete sessions not updated since `cutoff`. Returns how many went.
    async fn prune_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError>;
}
