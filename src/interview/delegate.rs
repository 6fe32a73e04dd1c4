//! Assistant delegate: the open-ended LLM call behind the scripted flow.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::DelegateError;
use crate::interview::state::HistoryEntry;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, costs};

/// Default bound on a single assistant call.
pub const DEFAULT_DELEGATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces free-form replies given prior turns and the current prompt.
#[async_trait]
pub trait AssistantDelegate: Send + Sync {
    /// `prompt` is the phase instruction followed by the user's message.
    async fn converse(&self, history: &[HistoryEntry], prompt: &str)
    -> Result<String, DelegateError>;
}

/// `AssistantDelegate` backed by an `LlmProvider`.
pub struct LlmDelegate {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl LlmDelegate {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            timeout: DEFAULT_DELEGATE_TIMEOUT,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Flatten history into alternating user/assistant messages and append the prompt.
fn build_messages(history: &[HistoryEntry], prompt: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 1);
    for entry in history {
        messages.push(ChatMessage::user(&entry.user_message));
        messages.push(ChatMessage::assistant(&entry.ai_response));
    }
    messages.push(ChatMessage::user(prompt));
    messages
}

#[async_trait]
impl AssistantDelegate for LlmDelegate {
    async fn converse(
        &self,
        history: &[HistoryEntry],
        prompt: &str,
    ) -> Result<String, DelegateError> {
        let mut request = CompletionRequest::new(build_messages(history, prompt));
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }

        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| DelegateError::Timeout(self.timeout))??;

        let cost = costs::estimate(
            self.llm.cost_per_token(),
            response.input_tokens,
            response.output_tokens,
        );
        tracing::debug!(
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            cost_usd = %cost,
            "Assistant call completed"
        );

        if response.content.trim().is_empty() {
            return Err(DelegateError::EmptyReply);
        }
        Ok(response.content)
    }
}
