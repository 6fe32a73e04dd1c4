//! Per-session interview state and conversation history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a session stands relative to a script of `N` questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    /// No question asked yet (index 0).
    NotStarted,
    /// Questions `0..next` have been asked (index 1..N-1).
    Asking,
    /// All N questions asked, recommendation pending (index N).
    AwaitingRecommendation,
    /// Recommendation delivered (index N+1). Terminal.
    Complete,
}

impl std::fmt::Display for ScriptPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Asking => "asking",
            Self::AwaitingRecommendation => "awaiting_recommendation",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Progress through the script.
///
/// `next_question_index` lives in `[0, N+1]`. Once `recommendation_given`
/// is set the index is pinned at `N+1` and nothing moves it back short of a
/// full reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub next_question_index: usize,
    pub recommendation_given: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase for a script of `question_count` questions.
    pub fn phase(&self, question_count: usize) -> ScriptPhase {
        if self.recommendation_given || self.next_question_index > question_count {
            ScriptPhase::Complete
        } else if self.next_question_index == question_count {
            ScriptPhase::AwaitingRecommendation
        } else if self.next_question_index == 0 {
            ScriptPhase::NotStarted
        } else {
            ScriptPhase::Asking
        }
    }

    /// Record that the question at `index` was just asked.
    pub fn ask(&mut self, index: usize) {
        self.next_question_index = self.next_question_index.max(index + 1);
    }

    /// Record delivery of the recommendation for a script of `question_count`.
    pub fn complete(&mut self, question_count: usize) {
        self.next_question_index = question_count + 1;
        self.recommendation_given = true;
    }
}

/// One user message and the reply it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_message: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(user_message: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ai_response: ai_response.into(),
            created_at: Utc::now(),
        }
    }
}

/// Everything persisted for one client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state: ConversationState,
    /// Append-only; cleared only by [`Session::reset`].
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            state: ConversationState::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Wipe progress and history, as if the session had just begun.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Append a turn to the history.
    pub fn record(&mut self, user_message: &str, ai_response: &str) {
        self.history.push(HistoryEntry::new(user_message, ai_response));
        self.updated_at = Utc::now();
    }

    /// The trailing `limit` entries, or all of them when `limit` is `None`.
    pub fn context_window(&self, limit: Option<usize>) -> &[HistoryEntry] {
        match limit {
            Some(n) if n < self.history.len() => &self.history[self.history.len() - n..],
            _ => &self.history,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
