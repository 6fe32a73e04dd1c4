//! Wires configuration into a ready-to-serve chat service.

use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ConfigError, Result};
use crate::interview::{ChatService, KeywordClassifier, LlmDelegate, Script, TurnController};
use crate::llm::create_provider;
use crate::store::{InMemorySessionStore, LibSqlSessionStore, SessionStore};

/// Load the script, build the assistant and session store, and assemble the
/// chat service.
pub async fn build_chat_service(config: &ServerConfig) -> Result<Arc<ChatService>> {
    let script = match &config.script_path {
        Some(path) => Script::from_json_file(path)?,
        None => Script::career(),
    };
    info!(questions = script.len(), "Interview script loaded");

    let classifier = KeywordClassifier::career().map_err(|e| ConfigError::InvalidValue {
        key: "recommendation keywords".to_string(),
        message: e.to_string(),
    })?;

    let llm = create_provider(&config.llm)?;
    let mut delegate = LlmDelegate::new(llm).with_timeout(config.delegate_timeout);
    if let Some(max_tokens) = config.max_tokens {
        delegate = delegate.with_max_tokens(max_tokens);
    }
    if let Some(temperature) = config.temperature {
        delegate = delegate.with_temperature(temperature);
    }

    let sessions: Arc<dyn SessionStore> = match &config.db_path {
        Some(path) => Arc::new(LibSqlSessionStore::new_local(path).await?),
        None => Arc::new(InMemorySessionStore::new()),
    };

    let controller = TurnController::new(Arc::new(script), Arc::new(classifier), Arc::new(delegate))?
        .with_history_window(config.history_window);
    Ok(Arc::new(ChatService::new(controller, sessions)))
}
