//! Interview system: scripted career questions, a fixed recommendation,
//! then open conversation with the assistant.
//!
//! Each incoming message is classified (`intent`), run through the turn
//! controller's decision table (`controller`) against the session's
//! progress (`state`) and the configured `script`, and either answered from
//! the script or handed to the assistant (`delegate`). `service` wraps all of
//! that with input validation, per-session locking, and persistence.

pub mod controller;
pub mod delegate;
pub mod intent;
pub mod script;
pub mod service;
pub mod state;

pub use controller::{Decision, TurnBranch, TurnController, TurnOutcome};
pub use delegate::{AssistantDelegate, LlmDelegate};
pub use intent::{IntentClassifier, KeywordClassifier};
pub use script::Script;
pub use service::{ChatService, SessionStatus, spawn_prune_task};
pub use state::{ConversationState, HistoryEntry, ScriptPhase, Session};
