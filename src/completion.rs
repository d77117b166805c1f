//! Remote chat-completion client.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::types::ConversationTurn;

pub const DEFAULT_COMPLETION_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo";

/// A single generated reply plus the token usage reported for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Stateless request/response access to a completion endpoint.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request one completion for the full ordered history.
    async fn complete(&self, history: &[ConversationTurn]) -> Result<Completion>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationTurn],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

impl TryFrom<CompletionResponse> for Completion {
    type Error = BotError;

    fn try_from(response: CompletionResponse) -> Result<Self> {
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BotError::CompletionResponse("No choices in response".to_string()))?
            .message
            .content
            .ok_or_else(|| BotError::CompletionResponse("Choice has no content".to_string()))?;

        let usage = response.usage.unwrap_or_default();

        Ok(Self {
            content,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
    }
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    api_key: String,
    api_url: String,
    client: reqwest::Client,
    model: String,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            api_key,
            api_url,
            client: reqwest::Client::new(),
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, history: &[ConversationTurn]) -> Result<Completion> {
        debug!(
            "Sending request to completion API with {} messages",
            history.len()
        );

        let request = CompletionRequest {
            model: &self.model,
            messages: history,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(BotError::CompletionApi { status, message });
        }

        let api_response: CompletionResponse = response.json().await?;
        let completion = Completion::try_from(api_response)?;

        debug!(
            "Received response from completion API ({} total tokens)",
            completion.total_tokens
        );
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Completion> {
        let response: CompletionResponse = serde_json::from_str(body)
            .map_err(|e| BotError::CompletionResponse(e.to_string()))?;
        Completion::try_from(response)
    }

    #[test]
    fn parses_content_and_usage() -> Result<()> {
        let completion = parse(
            r#"{
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "  Hello!\n"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            }"#,
        )?;
        assert_eq!(completion.content, "  Hello!\n");
        assert_eq!(completion.prompt_tokens, 12);
        assert_eq!(completion.completion_tokens, 3);
        assert_eq!(completion.total_tokens, 15);
        Ok(())
    }

    #[test]
    fn missing_usage_counts_as_zero() -> Result<()> {
        let completion = parse(r#"{"choices": [{"message": {"content": "ok"}}]}"#)?;
        assert_eq!(completion.total_tokens, 0);
        Ok(())
    }

    #[test]
    fn empty_choices_is_an_error() {
        let err = parse(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, BotError::CompletionResponse(_)));
    }

    #[test]
    fn null_content_is_an_error() {
        let err = parse(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap_err();
        assert!(matches!(err, BotError::CompletionResponse(_)));
    }

    #[test]
    fn request_carries_model_and_ordered_history() -> serde_json::Result<()> {
        let history = vec![
            ConversationTurn::system("You are a helper."),
            ConversationTurn::user("hi there"),
        ];
        let request = CompletionRequest {
            model: DEFAULT_COMPLETION_MODEL,
            messages: &history,
        };
        let json = serde_json::to_value(&request)?;
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    {"role": "system", "content": "You are a helper."},
                    {"role": "user", "content": "hi there"}
                ]
            })
        );
        Ok(())
    }
}
