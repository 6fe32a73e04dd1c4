//! Turn controller: decides what each incoming message gets back.
//!
//! Decision table, first match wins:
//!
//! 1. script not started and the message is a start trigger → question 0
//! 2. the message asks for recommendations → fixed recommendation, verbatim
//! 3. every question asked, recommendation pending → transition + recommendation
//! 4. questions remain → next question
//! 5. otherwise → assistant delegate with the phase instruction
//!
//! Rows 1–4 cannot fail. A failed delegate call (row 5) answers with the
//! script's apology and wipes the session: state and history both.

use std::sync::Arc;

use serde::Serialize;

use crate::error::ConfigError;
use crate::interview::delegate::AssistantDelegate;
use crate::interview::intent::IntentClassifier;
use crate::interview::script::Script;
use crate::interview::state::{ConversationState, Session};

/// Outcome of the pure decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Row 1: begin the script with question 0.
    StartScript,
    /// Row 2: the user asked for recommendations.
    DirectRecommendation,
    /// Row 3: all questions answered.
    AutoRecommendation,
    /// Row 4: ask the question at this index.
    NextQuestion(usize),
    /// Row 5: hand off to the assistant.
    Delegate { recommendation_given: bool },
}

/// Which path produced a turn's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnBranch {
    StartScript,
    DirectRecommendation,
    AutoRecommendation,
    NextQuestion,
    Delegated,
    DelegateFailed,
}

/// Result of one processed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub response: String,
    pub branch: TurnBranch,
    /// State after the turn.
    pub state: ConversationState,
}

/// Drives a session through the script and into open conversation.
pub struct TurnController {
    script: Arc<Script>,
    classifier: Arc<dyn IntentClassifier>,
    delegate: Arc<dyn AssistantDelegate>,
    history_window: Option<usize>,
}

impl TurnController {
    /// Fails if the script cannot be run (no questions, empty recommendation).
    pub fn new(
        script: Arc<Script>,
        classifier: Arc<dyn IntentClassifier>,
        delegate: Arc<dyn AssistantDelegate>,
    ) -> Result<Self, ConfigError> {
        script.validate()?;
        Ok(Self {
            script,
            classifier,
            delegate,
            history_window: None,
        })
    }

    /// Limit the history handed to the delegate to the last `limit` turns.
    pub fn with_history_window(mut self, limit: Option<usize>) -> Self {
        self.history_window = limit;
        self
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    /// Apply the decision table without side effects.
    pub fn decide(&self, message: &str, state: &ConversationState) -> Decision {
        let n = self.script.len();
        let index = state.next_question_index;
        let given = state.recommendation_given;

        if !given && index == 0 && self.classifier.detect_start(message) {
            Decision::StartScript
        } else if self.classifier.detect_recommendation_ask(message) {
            Decision::DirectRecommendation
        } else if !given && index == n {
            Decision::AutoRecommendation
        } else if !given && index < n {
            Decision::NextQuestion(index)
        } else {
            Decision::Delegate {
                recommendation_given: given,
            }
        }
    }

    /// Process one user message against `session`, mutating it in place.
    ///
    /// Every path appends a history entry for this turn before returning.
    pub async fn process_turn(&self, message: &str, session: &mut Session) -> TurnOutcome {
        let n = self.script.len();
        let decision = self.decide(message, &session.state);

        let (response, branch) = match decision {
            Decision::StartScript => {
                session.state.ask(0);
                (self.question_text(0), TurnBranch::StartScript)
            }
            Decision::DirectRecommendation => {
                session.state.complete(n);
                (
                    self.script.recommendation.clone(),
                    TurnBranch::DirectRecommendation,
                )
            }
            Decision::AutoRecommendation => {
                session.state.complete(n);
                (
                    self.script.auto_recommendation(),
                    TurnBranch::AutoRecommendation,
                )
            }
            Decision::NextQuestion(index) => {
                session.state.ask(index);
                (self.question_text(index), TurnBranch::NextQuestion)
            }
            Decision::Delegate {
                recommendation_given,
            } => {
                let instruction = self.script.instruction(recommendation_given);
                let prompt = format!("{instruction}\n\n{message}");
                let context = session.context_window(self.history_window);
                match self.delegate.converse(context, &prompt).await {
                    Ok(reply) => (reply, TurnBranch::Delegated),
                    Err(e) => {
                        tracing::error!(error = %e, "Assistant call failed, resetting session");
                        session.reset();
                        (self.script.apology.clone(), TurnBranch::DelegateFailed)
                    }
                }
            }
        };

        session.record(message, &response);
        tracing::debug!(
            branch = ?branch,
            next_question_index = session.state.next_question_index,
            recommendation_given = session.state.recommendation_given,
            "Turn processed"
        );

        TurnOutcome {
            response,
            branch,
            state: session.state,
        }
    }

    fn question_text(&self, index: usize) -> String {
        self.script.question(index).unwrap_or_default().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DelegateError, LlmError};
    use crate::interview::intent::KeywordClassifier;
    use crate::interview::state::HistoryEntry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Mutex;

    /// Records every call; fails while `fail` is set.
    #[derive(Default)]
    struct RecordingDelegate {
        fail: AtomicBool,
        calls: Mutex<Vec<(usize, String)>>,
    }

    #[async_trait]
    impl AssistantDelegate for RecordingDelegate {
        async fn converse(
            &self,
            history: &[HistoryEntry],
            prompt: &str,
        ) -> Result<String, DelegateError> {
            self.calls.lock().await.push((history.len(), prompt.to_string()));
            if self.fail.load(Ordering::SeqCst) {
                Err(DelegateError::Llm(LlmError::RequestFailed {
                    provider: "stub".into(),
                    reason: "unavailable".into(),
                }))
            } else {
                Ok("assistant reply".to_string())
            }
        }
    }

    fn controller_with(script: Script) -> (TurnController, Arc<RecordingDelegate>) {
        let delegate = Arc::new(RecordingDelegate::default());
        let controller = TurnController::new(
            Arc::new(script),
            Arc::new(KeywordClassifier::career().unwrap()),
            delegate.clone(),
        )
        .unwrap();
        (controller, delegate)
    }

    fn short_script() -> Script {
        Script {
            questions: vec!["Q0?".into(), "Q1?".into(), "Q2?".into()],
            ..Script::career()
        }
    }

    #[test]
    fn new_rejects_invalid_script() {
        let script = Script {
            questions: vec![],
            ..Script::career()
        };
        let result = TurnController::new(
            Arc::new(script),
            Arc::new(KeywordClassifier::career().unwrap()),
            Arc::new(RecordingDelegate::default()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn decide_table_rows() {
        let (c, _) = controller_with(short_script());
        let fresh = ConversationState::new();
        assert_eq!(c.decide("let's begin", &fresh), Decision::StartScript);
        assert_eq!(c.decide("what jobs?", &fresh), Decision::DirectRecommendation);
        assert_eq!(c.decide("hello", &fresh), Decision::NextQuestion(0));

        let mid = ConversationState {
            next_question_index: 2,
            recommendation_given: false,
        };
        assert_eq!(c.decide("let's begin", &mid), Decision::NextQuestion(2));

        let last = ConversationState {
            next_question_index: 3,
            recommendation_given: false,
        };
        assert_eq!(c.decide("outside", &last), Decision::AutoRecommendation);
        assert_eq!(c.decide("suggest", &last), Decision::DirectRecommendation);

        let mut done = ConversationState::new();
        done.complete(3);
        assert_eq!(
            c.decide("let's begin", &done),
            Decision::Delegate {
                recommendation_given: true
            }
        );
    }

    #[test]
    fn decide_never_asks_after_recommendation_even_with_stale_index() {
        let (c, _) = controller_with(short_script());
        let inconsistent = ConversationState {
            next_question_index: 1,
            recommendation_given: true,
        };
        assert_eq!(
            c.decide("anything", &inconsistent),
            Decision::Delegate {
                recommendation_given: true
            }
        );
        assert_eq!(
            c.decide("let's begin", &ConversationState {
                next_question_index: 0,
                recommendation_given: true,
            }),
            Decision::Delegate {
                recommendation_given: true
            }
        );
    }

    #[tokio::test]
    async fn full_script_then_auto_recommendation_then_delegate() {
        let (c, delegate) = controller_with(Script::career());
        let script = Script::career();
        let mut session = Session::new();

        let out = c.process_turn("let's begin", &mut session).await;
        assert_eq!(out.branch, TurnBranch::StartScript);
        assert_eq!(out.response, script.questions[0]);
        assert_eq!(out.state.next_question_index, 1);

        for i in 1..8 {
            let out = c.process_turn("I like being outdoors", &mut session).await;
            assert_eq!(out.branch, TurnBranch::NextQuestion);
            assert_eq!(out.response, script.questions[i]);
            assert_eq!(out.state.next_question_index, i + 1);
        }

        let out = c.process_turn("being creative", &mut session).await;
        assert_eq!(out.branch, TurnBranch::AutoRecommendation);
        assert!(out.response.starts_with("Thank you"));
        assert!(out.response.ends_with(&script.recommendation));
        assert_eq!(out.state.next_question_index, 9);
        assert!(out.state.recommendation_given);

        let out = c.process_turn("tell me more about option 1", &mut session).await;
        assert_eq!(out.branch, TurnBranch::Delegated);
        assert_eq!(out.response, "assistant reply");

        let calls = delegate.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (history_len, prompt) = &calls[0];
        assert_eq!(*history_len, 9);
        assert!(prompt.starts_with(&script.post_recommendation_instruction));
        assert!(prompt.ends_with("\n\ntell me more about option 1"));
        assert_eq!(session.history.len(), 10);
    }

    #[tokio::test]
    async fn early_ask_returns_exact_recommendation() {
        let (c, delegate) = controller_with(Script::career());
        let mut session = Session::new();

        let out = c.process_turn("what careers should I pick?", &mut session).await;
        assert_eq!(out.branch, TurnBranch::DirectRecommendation);
        assert_eq!(out.response, Script::career().recommendation);
        assert_eq!(out.state.next_question_index, 9);
        assert!(out.state.recommendation_given);
        assert!(delegate.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn mid_script_ask_jumps_to_complete() {
        let (c, _) = controller_with(short_script());
        let mut session = Session::new();
        c.process_turn("let's begin", &mut session).await;
        c.process_turn("an office", &mut session).await;

        let out = c.process_turn("just recommend something", &mut session).await;
        assert_eq!(out.response, short_script().recommendation);
        assert_eq!(out.state.next_question_index, 4);
    }

    #[tokio::test]
    async fn no_question_after_recommendation() {
        let (c, _) = controller_with(short_script());
        let mut session = Session::new();
        c.process_turn("suggest", &mut session).await;

        for msg in ["let's begin", "hello", "start questions", "recommend again"] {
            let out = c.process_turn(msg, &mut session).await;
            assert!(
                !short_script().questions.contains(&out.response),
                "{msg:?} produced a scripted question"
            );
            assert_eq!(out.state.next_question_index, 4);
            assert!(out.state.recommendation_given);
        }
    }

    #[tokio::test]
    async fn repeated_recommendation_ask_repeats_payload() {
        let (c, delegate) = controller_with(short_script());
        let mut session = Session::new();
        c.process_turn("suggest", &mut session).await;
        let out = c.process_turn("any other jobs?", &mut session).await;
        assert_eq!(out.branch, TurnBranch::DirectRecommendation);
        assert_eq!(out.response, short_script().recommendation);
        assert!(delegate.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn first_non_trigger_message_still_asks_first_question() {
        let (c, _) = controller_with(short_script());
        let mut session = Session::new();
        let out = c.process_turn("hi there", &mut session).await;
        assert_eq!(out.branch, TurnBranch::NextQuestion);
        assert_eq!(out.response, "Q0?");
        assert_eq!(out.state.next_question_index, 1);
    }

    #[tokio::test]
    async fn interview_without_start_phrase_runs_to_auto_recommendation() {
        let script = Script::career();
        let (c, delegate) = controller_with(script.clone());
        let mut session = Session::new();

        let answers = [
            "hi there",
            "outdoors mostly",
            "I like building things",
            "with my hands",
            "a small team",
            "fairly calm",
            "weekends off",
            "somewhere near home",
        ];
        for (i, answer) in answers.iter().enumerate() {
            let out = c.process_turn(answer, &mut session).await;
            assert_eq!(out.branch, TurnBranch::NextQuestion, "turn {i}");
            assert_eq!(out.response, script.questions[i]);
            assert_eq!(out.state.next_question_index, i + 1);
        }

        let out = c.process_turn("being creative", &mut session).await;
        assert_eq!(out.branch, TurnBranch::AutoRecommendation);
        assert_eq!(out.response, script.auto_recommendation());
        assert!(out.state.recommendation_given);
        assert_eq!(session.history.len(), 9);
        assert!(delegate.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn every_branch_records_history() {
        let (c, _) = controller_with(short_script());
        let mut session = Session::new();
        c.process_turn("let's begin", &mut session).await;
        c.process_turn("answer", &mut session).await;
        c.process_turn("suggest", &mut session).await;
        c.process_turn("thanks", &mut session).await;

        assert_eq!(session.history.len(), 4);
        assert_eq!(session.history[0].user_message, "let's begin");
        assert_eq!(session.history[0].ai_response, "Q0?");
        assert_eq!(session.history[3].ai_response, "assistant reply");
    }

    #[tokio::test]
    async fn delegate_failure_resets_session() {
        let (c, delegate) = controller_with(short_script());
        let mut session = Session::new();
        c.process_turn("suggest", &mut session).await;
        c.process_turn("hello", &mut session).await;

        delegate.fail.store(true, Ordering::SeqCst);
        let out = c.process_turn("and another thing", &mut session).await;
        assert_eq!(out.branch, TurnBranch::DelegateFailed);
        assert_eq!(out.response, short_script().apology);
        assert_eq!(out.state, ConversationState::default());
        // Only the failed turn survives the wipe.
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history[0].ai_response, short_script().apology);

        delegate.fail.store(false, Ordering::SeqCst);
        let out = c.process_turn("let's begin", &mut session).await;
        assert_eq!(out.branch, TurnBranch::StartScript);
        assert_eq!(out.response, "Q0?");
    }

    #[tokio::test]
    async fn history_window_limits_delegate_context() {
        let (c, delegate) = controller_with(short_script());
        let c = c.with_history_window(Some(2));
        let mut session = Session::new();
        c.process_turn("suggest", &mut session).await;
        c.process_turn("one", &mut session).await;
        c.process_turn("two", &mut session).await;
        c.process_turn("three", &mut session).await;

        let calls = delegate.calls.lock().await;
        let lens: Vec<usize> = calls.iter().map(|(len, _)| *len).collect();
        assert_eq!(lens, vec![1, 2, 2]);
        assert_eq!(session.history.len(), 4);
    }
}
