//! Error types for Career Assist.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Failures of the assistant delegate. All of them take the same recovery
/// path in the turn controller.
#[derive(Debug, thiserror::Error)]
pub enum DelegateError {
    #[error("Assistant call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Assistant call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Assistant returned an empty reply")]
    EmptyReply,
}

/// Errors surfaced by the chat service to the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("No message received")]
    EmptyMessage,

    #[error("Session store error: {0}")]
    Store(#[from] DatabaseError),
}
