//! Bridges rig-core's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel, Message};
use rust_decimal::Decimal;

use crate::error::LlmError;
use crate::llm::costs;
use crate::llm::provider::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role,
};

/// Wraps any rig completion model.
pub struct RigAdapter<M: CompletionModel> {
    model: M,
    model_name: String,
    costs: (Decimal, Decimal),
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            costs: costs::model_cost(model_name).unwrap_or_else(costs::default_cost),
        }
    }
}

/// Split our flat message list into rig's (preamble, history, prompt) shape.
///
/// System messages are concatenated into the preamble. The final user
/// message becomes the prompt; everything before it is history.
fn split_messages(
    messages: Vec<ChatMessage>,
) -> Result<(Option<String>, Vec<Message>, Message), String> {
    let mut preamble: Vec<String> = Vec::new();
    let mut history: Vec<Message> = Vec::new();
    let mut last_user: Option<usize> = None;

    for msg in messages {
        match msg.role {
            Role::System => preamble.push(msg.content),
            Role::User => {
                last_user = Some(history.len());
                history.push(Message::user(msg.content));
            }
            Role::Assistant => history.push(Message::assistant(msg.content)),
        }
    }

    let idx = last_user.ok_or_else(|| "request contains no user message".to_string())?;
    if idx + 1 != history.len() {
        return Err("last message must be from the user".to_string());
    }
    let prompt = history.remove(idx);
    let preamble = if preamble.is_empty() {
        None
    } else {
        Some(preamble.join("\n\n"))
    };
    Ok((preamble, history, prompt))
}

/// Concatenate the text parts of a reply. `None` if the model sent no text
/// at all (e.g. only tool calls).
fn response_text<'a>(parts: impl IntoIterator<Item = &'a AssistantContent>) -> Option<String> {
    let texts: Vec<&str> = parts
        .into_iter()
        .filter_map(|c| match c {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn cost_per_token(&self) -> (Decimal, Decimal) {
        self.costs
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (preamble, history, prompt) =
            split_messages(request.messages).map_err(|reason| LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason,
            })?;

        let mut builder = self.model.completion_request(prompt).messages(history);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if let Some(max_tokens) = request.max_tokens {
            builder = builder.max_tokens(u64::from(max_tokens));
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(f64::from(temperature));
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: e.to_string(),
        })?;

        let content =
            response_text(response.choice.iter()).ok_or_else(|| LlmError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: "reply contained no text".to_string(),
            })?;

        Ok(CompletionResponse {
            content,
            input_tokens: u32::try_from(response.usage.input_tokens).unwrap_or(u32::MAX),
            output_tokens: u32::try_from(response.usage.output_tokens).unwrap_or(u32::MAX),
        })
    }
}
