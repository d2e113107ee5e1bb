use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use super::retry::{RetryPolicy, send_with_retry};
use super::traits::LlmClient;

/// Base URL used when none is configured
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible chat completions client.
/// Works with: llama.cpp server, Ollama, DeepSeek, OpenAI, etc.
pub struct OpenAiClient {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    api_base: String,
    /// Optional API key; local servers usually run without one
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        api_base: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "OpenAI Compatible"
    }

    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint();
        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            // Low temperature for consistent translations
            temperature: Some(0.3),
        };

        let text = send_with_retry("OpenAI", self.retry, || {
            let req = self.client.post(&url).json(&request);
            match self.api_key {
                Some(ref key) => req.header("Authorization", format!("Bearer {key}")),
                None => req,
            }
        })
        .await?;

        parse_response(&text)
    }
}

/// Content of the first choice, with wrapping quotes removed.
pub fn parse_response(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::TranslationInvalidResponse("No choices in response".to_string()))?;

    // Some models wrap the whole answer in quotes
    Ok(content
        .trim()
        .trim_start_matches('"')
        .trim_end_matches('"')
        .to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":" \"Hallo Welt\" "}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Hallo Welt");
    }

    #[test]
    fn test_parse_no_choices() {
        let err = parse_response(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, Error::TranslationInvalidResponse(_)));
    }

    #[test]
    fn test_defaults() {
        let client =
            OpenAiClient::new(None, None, Some(String::new()), Duration::from_secs(5)).unwrap();
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(client.model, DEFAULT_MODEL);

        let local = OpenAiClient::new(
            Some("http://localhost:8080/v1/".to_string()),
            None,
            Some("llama".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(local.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
