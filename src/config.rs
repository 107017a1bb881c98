//! Configuration types for an extraction session.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes
//! it easy to share a config between the session and the top-level
//! `extract*` functions and to log it (the credential is masked).

use crate::error::ExtractError;
use crate::pipeline::client::{ModelClient, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::pipeline::layout::LayoutOptions;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Configuration for reading PDFs and calling the model.
///
/// # Example
/// ```rust
/// use equity_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("AIza...")
///     .model("gemini-2.0-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// API base URL. Default: `https://generativelanguage.googleapis.com`.
    pub endpoint: String,

    /// Model identifier. Default: `gemini-2.0-flash`.
    pub model: String,

    /// Credential passed to the endpoint as the `key` query parameter.
    pub api_key: Option<String>,

    /// Pre-constructed model client. Takes precedence over endpoint/model/key.
    pub client: Option<Arc<dyn ModelClient>>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional bound on the model call, in seconds. Default: none.
    pub api_timeout_secs: Option<u64>,

    /// Table-detection tunables.
    pub layout: LayoutOptions,

    /// Receives read/request progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            client: None,
            password: None,
            api_timeout_secs: None,
            layout: LayoutOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("layout", &self.layout)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs.max(1));
        self
    }

    pub fn layout(mut self, layout: LayoutOptions) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !(c.endpoint.starts_with("https://") || c.endpoint.starts_with("http://")) {
            return Err(ExtractError::InvalidConfig(format!(
                "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("Model must not be empty".into()));
        }
        if c.layout.min_rows == 0 {
            return Err(ExtractError::InvalidConfig(
                "Tables need at least one row (layout.min_rows ≥ 1)".into(),
            ));
        }
        Ok(self.config)
    }
}
