//! Progress-callback trait for read and request events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as files are read and while the model request is pending. The CLI
//! drives its spinner from these; a UI could forward them to a channel.
//!
//! # Example
//!
//! ```rust
//! use equity_extract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for PageCounter {
//!     fn on_document_read(&self, name: &str, pages: usize, tables: usize) {
//!         self.pages.fetch_add(pages, Ordering::SeqCst);
//!         eprintln!("{name}: {pages} pages, {tables} tables");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(PageCounter { pages: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it reads files and calls the model.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called before a file is opened.
    ///
    /// # Arguments
    /// * `name`  — display name of the upload
    /// * `index` — 1-indexed position among the uploads
    /// * `total` — number of uploads
    fn on_document_start(&self, name: &str, index: usize, total: usize) {
        let _ = (name, index, total);
    }

    /// Called when a file has been read.
    fn on_document_read(&self, name: &str, pages: usize, tables: usize) {
        let _ = (name, pages, tables);
    }

    /// Called when a file could not be read; the remaining files continue.
    fn on_document_error(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called just before the model request is sent.
    ///
    /// # Arguments
    /// * `model`      — client name (the model id for Gemini)
    /// * `prompt_len` — prompt length in bytes
    fn on_request_start(&self, model: &str, prompt_len: usize) {
        let _ = (model, prompt_len);
    }

    /// Called once the request has succeeded or failed.
    fn on_request_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started: AtomicUsize,
        read: AtomicUsize,
        errors: Mutex<Vec<String>>,
        outcome: Mutex<Option<bool>>,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_document_start(&self, _name: &str, _index: usize, _total: usize) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_read(&self, _name: &str, _pages: usize, _tables: usize) {
            self.read.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_error(&self, name: &str, _error: &str) {
            self.errors.lock().unwrap().push(name.to_string());
        }

        fn on_request_complete(&self, success: bool) {
            *self.outcome.lock().unwrap() = Some(success);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start("a.pdf", 1, 2);
        cb.on_document_read("a.pdf", 3, 1);
        cb.on_document_error("b.pdf", "not a PDF");
        cb.on_request_start("gemini-2.0-flash", 1024);
        cb.on_request_complete(true);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_document_start("a.pdf", 1, 2);
        tracker.on_document_read("a.pdf", 4, 2);
        tracker.on_document_start("b.pdf", 2, 2);
        tracker.on_document_error("b.pdf", "corrupt");
        tracker.on_request_complete(false);

        assert_eq!(tracker.started.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.read.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.errors.lock().unwrap(), vec!["b.pdf".to_string()]);
        assert_eq!(*tracker.outcome.lock().unwrap(), Some(false));
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_request_start("stub", 10);
        cb.on_request_complete(true);
    }
}
