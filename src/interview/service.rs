//! ChatService: validates input, serializes turns per session, and writes
//! results back through the session store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::ChatError;
use crate::interview::controller::{TurnController, TurnOutcome};
use crate::interview::state::{ScriptPhase, Session};
use crate::store::SessionStore;

/// Read-only view of a session for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub phase: ScriptPhase,
    pub next_question_index: usize,
    pub question_count: usize,
    pub recommendation_given: bool,
    pub turns: usize,
}

/// Entry point for the HTTP layer.
pub struct ChatService {
    controller: TurnController,
    store: Arc<dyn SessionStore>,
    /// One lock per session key so turns on the same session never interleave.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatService {
    pub fn new(controller: TurnController, store: Arc<dyn SessionStore>) -> Self {
        Self {
            controller,
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(session_id.to_string()).or_default())
    }

    /// Handle one user message.
    ///
    /// Empty or whitespace-only messages are rejected before the session is
    /// loaded, so a rejected request never changes state or history.
    pub async fn submit(&self, session_id: &str, message: &str) -> Result<TurnOutcome, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        let mut session = self.store.load(session_id).await?.unwrap_or_default();
        let outcome = self.controller.process_turn(message, &mut session).await;
        self.store.save(session_id, &session).await?;

        info!(
            session = session_id,
            branch = ?outcome.branch,
            next_question_index = outcome.state.next_question_index,
            "Chat turn handled"
        );
        Ok(outcome)
    }

    /// Start the session over: fresh state, empty history.
    pub async fn reset(&self, session_id: &str) -> Result<(), ChatError> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;
        self.store.save(session_id, &Session::new()).await?;
        info!(session = session_id, "Session reset");
        Ok(())
    }

    /// Destroy the session. Returns whether it existed.
    pub async fn end(&self, session_id: &str) -> Result<bool, ChatError> {
        let lock = self.session_lock(session_id).await;
        let existed = {
            let _guard = lock.lock().await;
            self.store.delete(session_id).await?
        };
        self.locks.lock().await.remove(session_id);
        if !existed {
            warn!(session = session_id, "Tried to end unknown session");
        }
        Ok(existed)
    }

    /// Delete sessions last updated before `cutoff` and drop every per-session
    /// lock that no request is holding or waiting on.
    pub async fn prune_idle(&self, cutoff: DateTime<Utc>) -> Result<usize, ChatError> {
        let pruned = self.store.prune_idle(cutoff).await?;
        let mut locks = self.locks.lock().await;
        // `session_lock` clones under the map lock, so a count of one means idle.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(pruned)
    }

    /// Current status, or `None` if the session does not exist.
    pub async fn status(&self, session_id: &str) -> Result<Option<SessionStatus>, ChatError> {
        let question_count = self.controller.script().len();
        let status = self.store.load(session_id).await?.map(|s| SessionStatus {
            phase: s.state.phase(question_count),
            next_question_index: s.state.next_question_index,
            question_count,
            recommendation_given: s.state.recommendation_given,
            turns: s.history.len(),
        });
        Ok(status)
    }
}

/// Periodically prune sessions idle for longer than `idle`.
pub fn spawn_prune_task(
    chat: Arc<ChatService>,
    every: Duration,
    idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let Ok(idle) = chrono::Duration::from_std(idle) else {
            warn!("Session idle timeout out of range, pruning disabled");
            return;
        };
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match chat.prune_idle(Utc::now() - idle).await {
                Ok(0) => {}
                Ok(n) => info!(pruned = n, "Pruned idle sessions"),
                Err(e) => warn!("Session prune failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DelegateError;
    use crate::interview::controller::TurnBranch;
    use crate::interview::delegate::AssistantDelegate;
    use crate::interview::intent::KeywordClassifier;
    use crate::interview::script::Script;
    use crate::interview::state::HistoryEntry;
    use crate::store::InMemorySessionStore;
    use async_trait::async_trait;

    struct EchoDelegate;

    #[async_trait]
    impl AssistantDelegate for EchoDelegate {
        async fn converse(
            &self,
            _history: &[HistoryEntry],
            prompt: &str,
        ) -> Result<String, DelegateError> {
            Ok(format!("echo: {}", prompt.rsplit("\n\n").next().unwrap_or_default()))
        }
    }

    fn service() -> (ChatService, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        let controller = TurnController::new(
            Arc::new(Script::career()),
            Arc::new(KeywordClassifier::career().unwrap()),
            Arc::new(EchoDelegate),
        )
        .unwrap();
        (ChatService::new(controller, store.clone()), store)
    }

    #[tokio::test]
    async fn empty_message_rejected_without_touching_session() {
        let (svc, store) = service();
        svc.submit("s1", "let's begin").await.unwrap();
        let before = store.load("s1").await.unwrap().unwrap();

        for bad in ["", "   ", "\n\t"] {
            let err = svc.submit("s1", bad).await.unwrap_err();
            assert!(matches!(err, ChatError::EmptyMessage));
        }
        assert_eq!(store.load("s1").await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn empty_message_does_not_create_session() {
        let (svc, store) = service();
        assert!(svc.submit("ghost", "").await.is_err());
        assert!(store.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let (svc, _) = service();
        svc.submit("a", "let's begin").await.unwrap();
        svc.submit("a", "an office").await.unwrap();
        let b = svc.submit("b", "what careers should I pick?").await.unwrap();
        assert_eq!(b.branch, TurnBranch::DirectRecommendation);

        let a = svc.status("a").await.unwrap().unwrap();
        assert_eq!(a.next_question_index, 2);
        assert!(!a.recommendation_given);
        assert_eq!(a.phase, ScriptPhase::Asking);

        let b = svc.status("b").await.unwrap().unwrap();
        assert_eq!(b.phase, ScriptPhase::Complete);
        assert_eq!(b.turns, 1);
    }

    #[tokio::test]
    async fn reset_starts_over() {
        let (svc, _) = service();
        svc.submit("s", "suggest").await.unwrap();
        svc.reset("s").await.unwrap();

        let status = svc.status("s").await.unwrap().unwrap();
        assert_eq!(status.phase, ScriptPhase::NotStarted);
        assert_eq!(status.turns, 0);

        let out = svc.submit("s", "let's begin").await.unwrap();
        assert_eq!(out.branch, TurnBranch::StartScript);
    }

    #[tokio::test]
    async fn end_removes_session() {
        let (svc, _) = service();
        svc.submit("s", "hello").await.unwrap();
        assert!(svc.end("s").await.unwrap());
        assert!(svc.status("s").await.unwrap().is_none());
        assert!(!svc.end("s").await.unwrap());
    }

    #[tokio::test]
    async fn message_is_trimmed_before_processing() {
        let (svc, store) = service();
        svc.submit("s", "  let's begin \n").await.unwrap();
        let session = store.load("s").await.unwrap().unwrap();
        assert_eq!(session.history[0].user_message, "let's begin");
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_session_stay_monotonic() {
        let (svc, _) = service();
        let svc = Arc::new(svc);
        svc.submit("s", "let's begin").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let svc = Arc::clone(&svc);
            handles.push(tokio::spawn(async move {
                svc.submit("s", "an answer").await.unwrap()
            }));
        }
        let mut indexes = Vec::new();
        for h in handles {
            indexes.push(h.await.unwrap().state.next_question_index);
        }
        indexes.sort_unstable();
        assert_eq!(indexes, vec![2, 3, 4, 5, 6]);

        let status = svc.status("s").await.unwrap().unwrap();
        assert_eq!(status.turns, 6);
    }

    #[tokio::test]
    async fn prune_drops_idle_sessions_and_their_locks() {
        let (svc, store) = service();
        for i in 0..200 {
            svc.submit(&format!("s{i}"), "hello").await.unwrap();
        }
        assert_eq!(svc.locks.lock().await.len(), 200);

        let pruned = svc.prune_idle(Utc::now() + chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(pruned, 200);
        assert!(store.is_empty().await);
        assert!(svc.locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn prune_keeps_locks_in_use() {
        let (svc, _) = service();
        svc.submit("busy", "hello").await.unwrap();
        svc.submit("idle", "hello").await.unwrap();

        let held = svc.session_lock("busy").await;
        svc.prune_idle(Utc::now() - chrono::Duration::hours(1)).await.unwrap();

        let locks = svc.locks.lock().await;
        assert!(locks.contains_key("busy"));
        assert!(!locks.contains_key("idle"));
        drop(held);
    }

    #[tokio::test]
    async fn pruned_session_starts_fresh() {
        let (svc, _) = service();
        svc.submit("s", "let's begin").await.unwrap();
        svc.prune_idle(Utc::now() + chrono::Duration::hours(1)).await.unwrap();
        assert!(svc.status("s").await.unwrap().is_none());

        let out = svc.submit("s", "let's begin").await.unwrap();
        assert_eq!(out.branch, TurnBranch::StartScript);
    }
}
