//! One operator session: uploaded documents, the editable prompt and the
//! latest extraction outcome.
//!
//! The session is a plain owned value. Submitting is split in two so a UI
//! can keep drawing while the request is in flight:
//!
//! ```text
//! Idle ──begin_extraction──▶ Pending ──complete(Ok)──▶ Ready(data)
//!                                    └─complete(Err)─▶ Failed(message)
//! ```
//!
//! [`Session::begin_extraction`] hands back an [`ExtractionRequest`] that owns
//! everything it needs, so nothing borrows the session across the await.
//! Uploading again replaces the documents, rebuilds the prompt and returns
//! the session to `Idle`. A request that is dropped without being completed
//! leaves the session `Pending` until [`Session::abandon_extraction`] or a
//! prompt change puts it back to `Idle`.

use crate::config::ExtractionConfig;
use crate::document::{self, Document, Table};
use crate::error::ExtractError;
use crate::extract;
use crate::pipeline::client::ModelClient;
use crate::pipeline::input::Upload;
use crate::pipeline::parse::FinancialData;
use crate::prompts;
use std::sync::Arc;
use tracing::{debug, info};

/// Where the latest submission stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExtractionState {
    /// Nothing submitted since the last upload.
    #[default]
    Idle,
    /// A request is in flight.
    Pending,
    /// The model answered with a JSON object.
    Ready(FinancialData),
    /// The last submission failed; the message is ready to show.
    Failed(String),
}

impl ExtractionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ExtractionState::Pending)
    }
}

#[derive(Debug)]
pub struct Session {
    config: ExtractionConfig,
    documents: Vec<Document>,
    read_failures: Vec<(String, ExtractError)>,
    prompt: String,
    state: ExtractionState,
}

impl Session {
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            config,
            documents: Vec::new(),
            read_failures: Vec::new(),
            prompt: String::new(),
            state: ExtractionState::Idle,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Read `uploads`, replacing whatever was uploaded before.
    ///
    /// Files that fail to read are kept in [`Session::read_failures`]; the
    /// others still contribute to the prompt.
    pub async fn upload(&mut self, uploads: &[Upload]) -> &[(String, ExtractError)] {
        let outcome = extract::read_documents(uploads, &self.config).await;
        self.read_failures = outcome.failures;
        self.load_documents(outcome.documents);
        &self.read_failures
    }

    /// Replace the documents with already-read ones.
    pub fn load_documents(&mut self, documents: Vec<Document>) {
        self.documents = documents;
        self.reset_prompt();
        self.state = ExtractionState::Idle;
        info!(
            "Session holds {} documents ({} chars of prompt)",
            self.documents.len(),
            self.prompt.len()
        );
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn read_failures(&self) -> &[(String, ExtractError)] {
        &self.read_failures
    }

    /// Flattened text of every document, in upload order.
    pub fn combined_text(&self) -> String {
        document::combine_text(&self.documents)
    }

    /// Every table of every document, in upload then page order.
    pub fn tables(&self) -> Vec<&Table> {
        self.documents.iter().flat_map(Document::tables).collect()
    }

    /// The prompt that will be submitted.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Replace the prompt with an operator-edited one.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
        self.abandon_extraction();
        debug!("Prompt replaced ({} chars)", self.prompt.len());
    }

    /// Restore the default prompt for the current documents.
    ///
    /// With no documents there is nothing to extract from and the prompt is
    /// empty.
    pub fn reset_prompt(&mut self) {
        self.prompt = if self.documents.is_empty() {
            String::new()
        } else {
            prompts::build_prompt(&self.combined_text())
        };
        self.abandon_extraction();
    }

    pub fn state(&self) -> &ExtractionState {
        &self.state
    }

    /// The latest successful answer, if any.
    pub fn result(&self) -> Option<&FinancialData> {
        match &self.state {
            ExtractionState::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// Move to `Pending` and return the request to send.
    ///
    /// # Errors
    /// [`ExtractError::InvalidConfig`] with an empty prompt or a request
    /// already pending; [`ExtractError::MissingApiKey`] when no client can be
    /// built. Client errors also move the session to `Failed`.
    pub fn begin_extraction(&mut self) -> Result<ExtractionRequest, ExtractError> {
        if self.state.is_pending() {
            return Err(ExtractError::InvalidConfig(
                "An extraction is already pending".into(),
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "Nothing to extract: upload a readable PDF first".into(),
            ));
        }

        let client = match extract::resolve_client(&self.config) {
            Ok(c) => c,
            Err(e) => {
                self.state = ExtractionState::Failed(e.to_string());
                return Err(e);
            }
        };

        self.state = ExtractionState::Pending;
        Ok(ExtractionRequest {
            client,
            prompt: self.prompt.clone(),
            config: self.config.clone(),
        })
    }

    /// Forget a pending request whose outcome will never be recorded.
    ///
    /// No-op unless the session is `Pending`.
    pub fn abandon_extraction(&mut self) {
        if self.state.is_pending() {
            debug!("Pending extraction abandoned");
            self.state = ExtractionState::Idle;
        }
    }

    /// Record the outcome of a request and hand it back.
    pub fn complete(
        &mut self,
        result: Result<FinancialData, ExtractError>,
    ) -> Result<FinancialData, ExtractError> {
        self.state = match &result {
            Ok(data) => ExtractionState::Ready(data.clone()),
            Err(e) => ExtractionState::Failed(e.to_string()),
        };
        result
    }

    /// Begin, send and complete in one call.
    pub async fn submit(&mut self) -> Result<FinancialData, ExtractError> {
        let request = self.begin_extraction()?;
        let result = request.send().await;
        self.complete(result)
    }
}

/// A submission detached from its session.
pub struct ExtractionRequest {
    client: Arc<dyn ModelClient>,
    prompt: String,
    config: ExtractionConfig,
}

impl ExtractionRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Call the model once and decode its answer.
    pub async fn send(self) -> Result<FinancialData, ExtractError> {
        extract::extract_with(self.client.as_ref(), &self.prompt, &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Page;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingClient {
        answers: Mutex<Vec<Result<String, ExtractError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingClient {
        fn answering(answers: Vec<Result<String, ExtractError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelClient for RecordingClient {
        async fn generate(&self, prompt: &str) -> Result<String, ExtractError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answers.lock().unwrap().remove(0)
        }
    }

    fn doc(name: &str, text: &str) -> Document {
        Document::new(
            name,
            vec![Page {
                number: 1,
                text: Some(text.to_string()),
                tables: vec![Table::new(vec![vec![
                    Some("Revenue".into()),
                    Some("1200".into()),
                ]])],
            }],
        )
    }

    fn session_with(client: Arc<RecordingClient>) -> Session {
        let config = ExtractionConfig::builder().client(client).build().unwrap();
        Session::new(config)
    }

    #[test]
    fn new_session_is_idle_with_empty_prompt() {
        let mut session = Session::new(ExtractionConfig::default());
        assert_eq!(*session.state(), ExtractionState::Idle);
        assert!(session.prompt().is_empty());
        assert!(matches!(
            session.begin_extraction(),
            Err(ExtractError::InvalidConfig(_))
        ));
    }

    #[test]
    fn loading_documents_builds_prompt_from_all_text() {
        let mut session = Session::new(ExtractionConfig::default());
        session.load_documents(vec![doc("a.pdf", "Rating: Buy"), doc("b.pdf", "TP: 150")]);

        assert_eq!(session.prompt(), prompts::build_prompt(&session.combined_text()));
        assert!(session.prompt().contains("Rating: Buy"));
        assert!(session.prompt().contains("TP: 150"));
        assert_eq!(session.tables().len(), 2);
    }

    #[tokio::test]
    async fn edited_prompt_is_what_gets_sent() {
        let client = RecordingClient::answering(vec![Ok(r#"{"rating":"Hold"}"#.into())]);
        let mut session = session_with(client.clone());
        session.load_documents(vec![doc("a.pdf", "Rating: Hold")]);
        session.set_prompt("my edited prompt");

        let data = session.submit().await.unwrap();
        assert_eq!(data["rating"], "Hold");
        assert_eq!(*client.prompts.lock().unwrap(), vec!["my edited prompt".to_string()]);
        assert_eq!(session.result(), Some(&data));
    }

    #[tokio::test]
    async fn state_moves_through_pending() {
        let client = RecordingClient::answering(vec![Ok("not json".into())]);
        let mut session = session_with(client);
        session.load_documents(vec![doc("a.pdf", "text")]);

        let request = session.begin_extraction().unwrap();
        assert!(session.state().is_pending());
        assert!(matches!(
            session.begin_extraction(),
            Err(ExtractError::InvalidConfig(_))
        ));

        let result = request.send().await;
        let err = session.complete(result).unwrap_err();
        assert!(matches!(err, ExtractError::Decode { .. }));
        match session.state() {
            ExtractionState::Failed(msg) => assert!(msg.contains("not json")),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn reupload_resets_prompt_and_state() {
        let client = RecordingClient::answering(vec![Ok(r#"{"rating":"Buy"}"#.into())]);
        let mut session = session_with(client);
        session.load_documents(vec![doc("a.pdf", "DOC-A-MARKER")]);
        session.set_prompt("edited");
        tokio_test::block_on(session.submit()).unwrap();
        assert!(session.result().is_some());

        session.load_documents(vec![doc("b.pdf", "DOC-B-MARKER")]);
        assert_eq!(*session.state(), ExtractionState::Idle);
        assert!(session.prompt().contains("DOC-B-MARKER"));
        assert!(!session.prompt().contains("DOC-A-MARKER"));
    }

    #[test]
    fn dropped_request_does_not_block_resubmission() {
        let client = RecordingClient::answering(vec![Ok(r#"{"rating":"Hold"}"#.into())]);
        let mut session = session_with(client);
        session.load_documents(vec![doc("a.pdf", "CMP: 100")]);

        let request = session.begin_extraction().unwrap();
        drop(request);
        assert!(session.state().is_pending());

        session.set_prompt("retry");
        assert_eq!(*session.state(), ExtractionState::Idle);
        let data = tokio_test::block_on(session.submit()).unwrap();
        assert_eq!(data["rating"], "Hold");
    }

    #[test]
    fn abandon_clears_only_pending() {
        let client = RecordingClient::answering(vec![Ok(r#"{"rating":"Buy"}"#.into())]);
        let mut session = session_with(client);
        session.load_documents(vec![doc("a.pdf", "CMP: 100")]);

        let _request = session.begin_extraction().unwrap();
        session.abandon_extraction();
        assert_eq!(*session.state(), ExtractionState::Idle);
        assert!(session.begin_extraction().is_ok());

        session.complete(Err(ExtractError::Internal("boom".into()))).unwrap_err();
        session.abandon_extraction();
        assert!(matches!(session.state(), ExtractionState::Failed(_)));
    }

    #[test]
    fn reset_prompt_discards_edits() {
        let mut session = Session::new(ExtractionConfig::default());
        session.load_documents(vec![doc("a.pdf", "CMP: 100")]);
        let default_prompt = session.prompt().to_string();
        session.set_prompt("x");
        session.reset_prompt();
        assert_eq!(session.prompt(), default_prompt);
    }

    #[test]
    fn missing_key_fails_without_pending() {
        let mut session = Session::new(ExtractionConfig::default());
        session.load_documents(vec![doc("a.pdf", "text")]);
        assert!(matches!(
            session.begin_extraction(),
            Err(ExtractError::MissingApiKey)
        ));
        assert!(matches!(session.state(), ExtractionState::Failed(_)));
    }

    #[tokio::test]
    async fn failed_upload_is_recorded() {
        let mut session = Session::new(ExtractionConfig::default());
        let failures = session
            .upload(&[Upload::from_bytes("scan.png", b"\x89PNG....".to_vec())])
            .await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "scan.png");
        assert!(session.documents().is_empty());
        assert!(session.prompt().is_empty());
    }
}
