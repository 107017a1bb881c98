//! Top-level entry points: read uploads, call the model, save the answer.
//!
//! These are the building blocks the [`crate::session::Session`] and the CLI
//! compose. Reading is sequential, one file at a time; a file that fails to
//! read is reported and the rest still contribute text.

use crate::config::ExtractionConfig;
use crate::document::{self, Document};
use crate::error::ExtractError;
use crate::pipeline::client::{GeminiClient, ModelClient};
use crate::pipeline::input::{self, Upload};
use crate::pipeline::parse::{self, FinancialData};
use crate::pipeline::reader;
use crate::prompts;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Read one upload into a [`Document`].
///
/// In-memory uploads are spooled to a temp file that is removed before this
/// returns.
pub async fn read_document(
    upload: &Upload,
    config: &ExtractionConfig,
) -> Result<Document, ExtractError> {
    let name = upload.name();
    let resolved = input::resolve_input(upload)?;
    reader::read_pdf(
        resolved.path(),
        &name,
        config.password.as_deref(),
        config.layout,
    )
    .await
}

/// Outcome of reading several uploads.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    /// Successfully read documents, in upload order.
    pub documents: Vec<Document>,
    /// Uploads that could not be read: display name and error.
    pub failures: Vec<(String, ExtractError)>,
}

impl ReadOutcome {
    /// Concatenated flattened text of every readable document.
    pub fn combined_text(&self) -> String {
        document::combine_text(&self.documents)
    }
}

/// Read every upload in order, collecting failures instead of stopping.
pub async fn read_documents(uploads: &[Upload], config: &ExtractionConfig) -> ReadOutcome {
    let total = uploads.len();
    let mut outcome = ReadOutcome::default();

    for (idx, upload) in uploads.iter().enumerate() {
        let name = upload.name();
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(&name, idx + 1, total);
        }

        match read_document(upload, config).await {
            Ok(doc) => {
                let tables = doc.tables().count();
                info!("Read {}: {} pages, {} tables", name, doc.page_count(), tables);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_read(&name, doc.page_count(), tables);
                }
                outcome.documents.push(doc);
            }
            Err(e) => {
                warn!("Could not read {}: {}", name, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_error(&name, &e.to_string());
                }
                outcome.failures.push((name, e));
            }
        }
    }

    outcome
}

/// The injected client, or a [`GeminiClient`] built from the config.
pub fn resolve_client(config: &ExtractionConfig) -> Result<Arc<dyn ModelClient>, ExtractError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }
    Ok(Arc::new(GeminiClient::from_config(config)?))
}

/// Send `prompt` to the model once and decode the answer.
///
/// # Errors
/// Transport, envelope and decode failures are returned as-is; nothing is
/// retried.
pub async fn extract(
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<FinancialData, ExtractError> {
    let client = resolve_client(config)?;
    extract_with(client.as_ref(), prompt, config).await
}

/// [`extract`] with an explicit client.
pub async fn extract_with(
    client: &dyn ModelClient,
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<FinancialData, ExtractError> {
    let start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(client.name(), prompt.len());
    }

    let result = match client.generate(prompt).await {
        Ok(raw) => parse::parse_response(&raw),
        Err(e) => Err(e),
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_complete(result.is_ok());
    }

    match &result {
        Ok(data) => {
            let missing = prompts::missing_fields(data);
            info!(
                "Extracted {} fields in {:?} ({} schema fields missing)",
                data.len(),
                start.elapsed(),
                missing.len()
            );
        }
        Err(e) => warn!("Extraction failed after {:?}: {}", start.elapsed(), e),
    }
    result
}

/// Read every upload, build the default prompt and extract in one go.
///
/// Fails with the first read error if no upload could be read.
pub async fn extract_files(
    uploads: &[Upload],
    config: &ExtractionConfig,
) -> Result<FinancialData, ExtractError> {
    let outcome = read_documents(uploads, config).await;
    if outcome.documents.is_empty() {
        if let Some((_, e)) = outcome.failures.into_iter().next() {
            return Err(e);
        }
        return Err(ExtractError::InvalidConfig("No PDF files given".into()));
    }
    let prompt = prompts::build_prompt(&outcome.combined_text());
    extract(&prompt, config).await
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    prompt: &str,
    config: &ExtractionConfig,
) -> Result<FinancialData, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(prompt, config))
}

// ── Output artifact ──────────────────────────────────────────────────────

/// The downloadable form of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonArtifact {
    pub file_name: &'static str,
    pub media_type: &'static str,
    /// Two-space-indented JSON.
    pub body: String,
}

impl JsonArtifact {
    pub const FILE_NAME: &'static str = "financial_data.json";
    pub const MEDIA_TYPE: &'static str = "application/json";

    pub fn from_data(data: &FinancialData) -> Result<Self, ExtractError> {
        let body = serde_json::to_string_pretty(data)
            .map_err(|e| ExtractError::Internal(format!("JSON serialisation: {e}")))?;
        Ok(Self {
            file_name: Self::FILE_NAME,
            media_type: Self::MEDIA_TYPE,
            body,
        })
    }

    /// Write `{dir}/financial_data.json`, replacing any previous file.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExtractError> {
        let dir = dir.as_ref();
        let path = dir.join(self.file_name);
        let write_err = |source: std::io::Error| ExtractError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &self.body)
            .await
            .map_err(write_err)?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(write_err)?;

        debug!("Wrote {} bytes to {}", self.body.len(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct CannedClient {
        answer: Result<String, u16>,
        seen: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn ok(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for CannedClient {
        async fn generate(&self, prompt: &str) -> Result<String, ExtractError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            match &self.answer {
                Ok(s) => Ok(s.clone()),
                Err(status) => Err(ExtractError::Transport {
                    status: *status,
                    body: "denied".into(),
                }),
            }
        }
    }

    fn config_with(client: Arc<dyn ModelClient>) -> ExtractionConfig {
        ExtractionConfig::builder().client(client).build().unwrap()
    }

    #[tokio::test]
    async fn injected_client_is_used_and_answer_parsed() {
        let client = Arc::new(CannedClient::ok("```json\n{\"rating\":\"Buy\"}\n```"));
        let config = config_with(client.clone());
        let data = extract("the prompt", &config).await.unwrap();
        assert_eq!(data["rating"], "Buy");
        assert_eq!(*client.seen.lock().unwrap(), vec!["the prompt".to_string()]);
    }

    #[tokio::test]
    async fn transport_error_is_returned_unchanged() {
        let client = Arc::new(CannedClient {
            answer: Err(403),
            seen: Mutex::new(Vec::new()),
        });
        let err = extract("p", &config_with(client)).await.unwrap_err();
        assert!(matches!(err, ExtractError::Transport { status: 403, .. }));
    }

    #[tokio::test]
    async fn missing_key_without_client() {
        let err = extract("p", &ExtractionConfig::default()).await.unwrap_err();
        assert!(matches!(err, ExtractError::MissingApiKey));
    }

    #[tokio::test]
    async fn unreadable_uploads_are_collected() {
        let uploads = vec![
            Upload::from_path("/no/such/file.pdf"),
            Upload::from_bytes("notes.txt", b"hello".to_vec()),
        ];
        let outcome = read_documents(&uploads, &ExtractionConfig::default()).await;
        assert!(outcome.documents.is_empty());
        let names: Vec<_> = outcome.failures.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["file.pdf", "notes.txt"]);
        assert!(outcome.failures.iter().all(|(_, e)| e.is_read_failure()));
    }

    #[tokio::test]
    async fn extract_files_reports_first_read_error() {
        let client = Arc::new(CannedClient::ok("{}"));
        let err = extract_files(&[Upload::from_path("/no/such.pdf")], &config_with(client))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
    }

    #[test]
    fn artifact_is_pretty_json() {
        let data: FinancialData =
            serde_json::from_str(r#"{"rating":"Buy","current_price":"100"}"#).unwrap();
        let artifact = JsonArtifact::from_data(&data).unwrap();
        assert_eq!(artifact.file_name, "financial_data.json");
        assert_eq!(artifact.media_type, "application/json");
        assert_eq!(
            artifact.body,
            "{\n  \"rating\": \"Buy\",\n  \"current_price\": \"100\"\n}"
        );
    }

    #[tokio::test]
    async fn artifact_write_replaces_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let first: FinancialData = serde_json::from_str(r#"{"rating":"Hold"}"#).unwrap();
        let second: FinancialData = serde_json::from_str(r#"{"rating":"Sell"}"#).unwrap();

        JsonArtifact::from_data(&first).unwrap().write_to(dir.path()).await.unwrap();
        let path = JsonArtifact::from_data(&second)
            .unwrap()
            .write_to(dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("financial_data.json"));
        let saved: FinancialData =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["rating"], "Sell");
        assert!(!dir.path().join("financial_data.json.tmp").exists());
    }

    #[test]
    fn extract_sync_runs_without_a_runtime() {
        let client = Arc::new(CannedClient::ok(r#"{"target_price":"150"}"#));
        let data = extract_sync("p", &config_with(client)).unwrap();
        assert_eq!(data["target_price"], "150");
    }
}
