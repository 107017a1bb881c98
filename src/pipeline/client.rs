//! Model interaction: send the prompt, return the model's raw text answer.
//!
//! The only stage with network I/O. It is intentionally thin: all prompt
//! engineering lives in [`crate::prompts`] and all answer cleanup in
//! [`crate::pipeline::parse`].
//!
//! ## No retry
//!
//! Each submission is a single attempt. A failed call surfaces immediately as
//! an [`ExtractError`] and the operator resubmits. There is no timeout either,
//! unless [`crate::config::ExtractionConfig::api_timeout_secs`] sets one.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default Gemini API base URL.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Anything that turns a prompt into the model's raw text answer.
///
/// Implement this to route extraction through another provider or, in tests,
/// to return a canned answer.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` once and return the model's text.
    async fn generate(&self, prompt: &str) -> Result<String, ExtractError>;

    /// Short identifier for logs.
    fn name(&self) -> &str {
        "model"
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    pub(crate) fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub(crate) fn extract_candidate_text(body: &str) -> Result<String, ExtractError> {
    let envelope: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ExtractError::Envelope {
            detail: format!("response is not valid JSON: {e}"),
        })?;

    let candidate = envelope
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ExtractError::Envelope {
            detail: "response has no candidates".to_string(),
        })?;

    let finish_reason = candidate.finish_reason;
    candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| ExtractError::Envelope {
            detail: match finish_reason {
                Some(reason) => format!("first candidate has no text part (finishReason: {reason})"),
                None => "first candidate has no text part".to_string(),
            },
        })
}

// ── Gemini ───────────────────────────────────────────────────────────────

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ExtractError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from the config's endpoint, model, key and timeout.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ExtractError::MissingApiKey)?;

        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            config.api_timeout_secs.map(Duration::from_secs),
        )
    }

    /// `{endpoint}/v1beta/models/{model}:generateContent`, without the key.
    pub fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ExtractError> {
        let start = Instant::now();
        info!("Sending {} chars to {}", prompt.len(), self.model);

        let response = self
            .http
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateContentRequest::new(prompt))
            .send()
            .await
            // reqwest includes the URL (and so the key) in its Display output.
            .map_err(|e| ExtractError::Request {
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ExtractError::Request {
            reason: e.without_url().to_string(),
        })?;

        if !status.is_success() {
            warn!("{} answered HTTP {}", self.model, status.as_u16());
            return Err(ExtractError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let text = extract_candidate_text(&body)?;
        debug!(
            "{} answered {} chars in {:?}",
            self.model,
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_generate_content_shape() {
        let body = serde_json::to_value(GenerateContentRequest::new("hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "hello"}]}]})
        );
    }

    #[test]
    fn candidate_text_is_extracted() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"rating\":\"Buy\"}"}], "role": "model"},
                 "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 10}
        }"#;
        assert_eq!(extract_candidate_text(body).unwrap(), r#"{"rating":"Buy"}"#);
    }

    #[test]
    fn missing_candidates_is_envelope_error() {
        let err = extract_candidate_text(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .unwrap_err();
        match err {
            ExtractError::Envelope { detail } => assert!(detail.contains("no candidates")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_parts_reports_finish_reason() {
        let err = extract_candidate_text(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#)
            .unwrap_err();
        match err {
            ExtractError::Envelope { detail } => assert!(detail.contains("MAX_TOKENS")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_envelope_error() {
        let err = extract_candidate_text("<html>oops</html>").unwrap_err();
        assert!(matches!(err, ExtractError::Envelope { .. }));
    }

    #[test]
    fn url_and_debug_never_show_key() {
        let client = GeminiClient::new(
            "https://generativelanguage.googleapis.com/",
            "gemini-2.0-flash",
            "secret-key",
            None,
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("secret-key"));
        assert_eq!(client.name(), "gemini-2.0-flash");
    }

    #[test]
    fn from_config_requires_key() {
        let config = ExtractionConfig::default();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ExtractError::MissingApiKey)
        ));

        let config = ExtractionConfig::builder().api_key("   ").build().unwrap();
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ExtractError::MissingApiKey)
        ));
    }
}
