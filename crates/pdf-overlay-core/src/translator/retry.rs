//! Request loop shared by the HTTP providers.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};

/// Default number of attempts per request
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Default delay between attempts in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
/// Wait used on HTTP 429 when the server sends no Retry-After
const RATE_LIMIT_DEFAULT_WAIT: Duration = Duration::from_secs(5);
/// Longest Retry-After that is honored
const RATE_LIMIT_MAX_WAIT: Duration = Duration::from_secs(60);

/// How often and how patiently a request is retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay_ms: u64) -> Self {
        Self {
            attempts,
            delay: Duration::from_millis(delay_ms),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_COUNT, DEFAULT_RETRY_DELAY_MS)
    }
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Whether a failed status is worth another attempt
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT
}

/// Send the request built by `build` until it succeeds or attempts run out.
///
/// Returns the body of the first successful response. Rate limiting (429)
/// waits for Retry-After; other client errors fail immediately.
pub async fn send_with_retry<F>(provider: &str, policy: RetryPolicy, build: F) -> Result<String>
where
    F: Fn() -> RequestBuilder,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        debug!("{provider} request attempt {}/{attempts}", attempt + 1);

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .text()
                        .await
                        .map_err(|e| Error::TranslationInvalidResponse(e.to_string()));
                }

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = retry_after(response.headers());
                    warn!("{provider} rate limited, retry after {:?}s", retry_after);
                    last_error = Some(Error::TranslationRateLimited { retry_after });

                    if attempt + 1 < attempts {
                        let wait = retry_after
                            .map_or(RATE_LIMIT_DEFAULT_WAIT, Duration::from_secs)
                            .min(RATE_LIMIT_MAX_WAIT);
                        tokio::time::sleep(wait).await;
                    }
                    continue;
                }

                let body = response.text().await.unwrap_or_default();
                let detail = error_detail(&body).unwrap_or(body);
                warn!("{provider} API error: {status} - {detail}");
                let err = Error::TranslationRequest(format!("HTTP {status}: {detail}"));
                if !is_retryable(status) {
                    return Err(err);
                }
                last_error = Some(err);
            }
            Err(e) => {
                warn!("{provider} request failed: {e}");
                last_error = Some(if e.is_timeout() {
                    Error::TranslationTimeout
                } else {
                    Error::TranslationRequest(e.to_string())
                });
            }
        }

        if attempt + 1 < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    error!("{provider} failed after {attempts} attempts");
    Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
}

/// Human-readable summary of a JSON error body.
///
/// Both Gemini (`{"error": {"message", "status", "code"}}`) and OpenAI
/// (`{"error": {"message", "type", "code"}}`) shapes are understood.
pub fn error_detail(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    let error = parsed.get("error")?;

    let field = |name: &str| match error.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let mut parts = Vec::new();
    if let Some(message) = field("message") {
        parts.push(message);
    }
    if let Some(kind) = field("status").or_else(|| field("type")) {
        parts.push(format!("type: {kind}"));
    }
    if let Some(code) = field("code") {
        parts.push(format!("code: {code}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_error_detail() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some("API key not valid. | type: INVALID_ARGUMENT | code: 400")
        );
    }

    #[test]
    fn test_openai_error_detail() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#;
        assert_eq!(
            error_detail(body).as_deref(),
            Some("Rate limit reached | type: requests | code: rate_limit_exceeded")
        );
    }

    #[test]
    fn test_non_json_body_has_no_detail() {
        assert_eq!(error_detail("<html>Bad Gateway</html>"), None);
        assert_eq!(error_detail(r#"{"error":{}}"#), None);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
