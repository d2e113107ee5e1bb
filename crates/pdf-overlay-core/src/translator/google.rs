use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::config::{Lang, StatisticalConfig};
use crate::error::{Error, Result};
use super::retry::{RetryPolicy, send_with_retry};
use super::traits::{ProviderInfo, ProviderKind, TranslationProvider};

/// Fallback translator: the public Google Translate endpoint.
///
/// Needs no key. The text goes in a form-encoded POST body so page-sized
/// inputs do not hit URL length limits.
pub struct StatisticalProvider {
    client: Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl StatisticalProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            retry: RetryPolicy::new(2, 500),
        })
    }

    pub fn from_config(config: &StatisticalConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl TranslationProvider for StatisticalProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Google Translate",
            kind: ProviderKind::Statistical,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        let form = format!("q={}", urlencoding::encode(text));
        let query = [
            ("client", "gtx"),
            ("sl", source.as_str()),
            ("tl", target.as_str()),
            ("dt", "t"),
        ];

        let body = send_with_retry("Google Translate", self.retry, || {
            self.client
                .post(&self.endpoint)
                .query(&query)
                .header("Content-Type", "application/x-www-form-urlencoded;charset=utf-8")
                .body(form.clone())
        })
        .await?;

        let translated = parse_response(&body)?;
        info!(
            "Google Translate: {} chars -> {} chars",
            text.chars().count(),
            translated.chars().count()
        );
        Ok(translated)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The payload is a positional array; `[0]` lists sentence segments as
/// `[translated, original, ...]`.
pub fn parse_response(body: &str) -> Result<String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| {
            Error::TranslationInvalidResponse(format!("Failed to parse Google response: {e}"))
        })?;

    let segments = value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::TranslationInvalidResponse("Google response has no segments".to_string())
        })?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.trim().is_empty() {
        return Err(Error::TranslationInvalidResponse(
            "Google response has no translated text".to_string(),
        ));
    }

    Ok(translated)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_joins_segments() {
        let body = r#"[[["Hallo Welt. ","Hello world. ",null,null,10],["Wie geht's?","How are you?",null,null,10]],null,"en"]"#;
        assert_eq!(parse_response(body).unwrap(), "Hallo Welt. Wie geht's?");
    }

    #[test]
    fn test_parse_skips_non_text_segments() {
        let body = r#"[[["Bonjour",  "Hello"], [null, null, "Bonzhur"]],null,"en"]"#;
        assert_eq!(parse_response(body).unwrap(), "Bonjour");
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        assert!(parse_response(r#"{"error":"x"}"#).is_err());
        assert!(parse_response("[null]").is_err());
        assert!(parse_response("[[]]").is_err());
        assert!(parse_response("nope").is_err());
    }
}
