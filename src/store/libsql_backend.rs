//! libSQL backend: durable `SessionStore` implementation.
//!
//! Supports local file and in-memory databases. Each session is one row;
//! the turn history is stored as a JSON array column.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::DatabaseError;
use crate::interview::state::{ConversationState, HistoryEntry, Session};
use crate::store::migrations;
use crate::store::traits::SessionStore;

/// libSQL session store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlSessionStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlSessionStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Session database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Fixed-width UTC timestamps so lexical order matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn row_to_session(row: &libsql::Row) -> Result<Session, DatabaseError> {
    let index: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("next_question_index: {e}")))?;
    let given: i64 = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("recommendation_given: {e}")))?;
    let history_json: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("history: {e}")))?;
    let created_at: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("created_at: {e}")))?;
    let updated_at: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("updated_at: {e}")))?;

    let history: Vec<HistoryEntry> = serde_json::from_str(&history_json)
        .map_err(|e| DatabaseError::Serialization(format!("history: {e}")))?;

    Ok(Session {
        state: ConversationState {
            next_question_index: usize::try_from(index).unwrap_or(0),
            recommendation_given: given != 0,
        },
        history,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

#[async_trait]
impl SessionStore for LibSqlSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT next_question_index, recommendation_given, history, created_at, updated_at
                 FROM sessions WHERE id = ?1",
                params![session_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("load_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_session(&row).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("load_session: {e}"))),
        }
    }

    async fn save(&self, session_id: &str, session: &Session) -> Result<(), DatabaseError> {
        let history = serde_json::to_string(&session.history)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let index = i64::try_from(session.state.next_question_index)
            .map_err(|e| DatabaseError::Serialization(format!("next_question_index: {e}")))?;

        self.conn()
            .execute(
                "INSERT INTO sessions (id, next_question_index, recommendation_given, history, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (id) DO UPDATE SET
                    next_question_index = ?2,
                    recommendation_given = ?3,
                    history = ?4,
                    created_at = ?5,
                    updated_at = ?6",
                params![
                    session_id,
                    index,
                    i64::from(session.state.recommendation_given),
                    history,
                    format_datetime(&session.created_at),
                    format_datetime(&session.updated_at)
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_session: {e}")))?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_session: {e}")))?;
        Ok(count > 0)
    }

    async fn prune_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM sessions WHERE updated_at < ?1",
                params![format_datetime(&cutoff)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("prune_sessions: {e}")))?;
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }
}
