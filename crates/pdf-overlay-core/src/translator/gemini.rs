use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use super::retry::{RetryPolicy, send_with_retry};
use super::traits::LlmClient;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini `generateContent` client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    /// Use another model; blank names keep the default
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    /// Point the client at another host (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint();
        let body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }
            ]
        });

        let text = send_with_retry("Gemini", self.retry, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", self.api_key.as_str())
                .json(&body)
        })
        .await?;

        parse_response(&text)
    }
}

/// Concatenate the text parts of the first candidate.
pub fn parse_response(body: &str) -> Result<String> {
    let payload: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| {
            Error::TranslationInvalidResponse(format!("Failed to parse Gemini response JSON: {e}"))
        })?;

    let Some(candidate) = payload.candidates.first() else {
        let reason = payload
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map_or_else(
                || "no candidate returned".to_string(),
                |r| format!("prompt blocked: {r}"),
            );
        return Err(Error::TranslationInvalidResponse(format!("Gemini: {reason}")));
    };

    let text: String = candidate
        .content
        .iter()
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(Error::TranslationInvalidResponse(format!(
            "Gemini returned no text (finish reason: {reason})"
        )));
    }

    Ok(text)
}
