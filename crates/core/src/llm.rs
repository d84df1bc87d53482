use crate::traits::LanguageModel;
use crate::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";

/// OpenAI-compatible chat completions client (Groq by default).
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, SearchError> {
        let api_key: String = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SearchError::Request("missing language model API key".to_string()));
        }

        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(120)).build()?,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, SearchError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: "chat-completions".to_string(),
                details: format!("{status}: {text}"),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        first_answer(parsed)
    }
}

/// Stand-in when no API key is configured; every completion fails, so the
/// assistant answers with the raw search results.
pub struct NoLanguageModel;

#[async_trait]
impl LanguageModel for NoLanguageModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, SearchError> {
        Err(SearchError::Request("no language model configured".to_string()))
    }
}

fn first_answer(parsed: ChatResponse) -> Result<String, SearchError> {
    parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| SearchError::BackendResponse {
            backend: "chat-completions".to_string(),
            details: "response had no message content".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_api_key_is_rejected() {
        let result = ChatCompletionsClient::new(DEFAULT_CHAT_ENDPOINT, DEFAULT_CHAT_MODEL, "  ");
        assert!(matches!(result, Err(SearchError::Request(_))));
    }

    #[test]
    fn first_non_empty_choice_is_the_answer() -> Result<(), Box<dyn std::error::Error>> {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": null}}, {"message": {"content": "Try the Galaxy S24."}}]}"#,
        )?;
        assert_eq!(first_answer(parsed)?, "Try the Galaxy S24.");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#)?;
        assert!(first_answer(empty).is_err());
        Ok(())
    }
}
