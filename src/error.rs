//! Error types for the equity-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal for one operation**: a file could not be
//!   read, the model endpoint rejected the request, or the model's answer
//!   was not a JSON object. Returned as `Err(ExtractError)` from the reader,
//!   the client, the parser and the top-level `extract*` functions. A failed
//!   operation never poisons the [`crate::session::Session`]; the operator
//!   fixes the input and tries again.
//!
//! * [`TableRenderError`] — **Non-fatal**: one table preview could not be
//!   written. The caller reports it and moves on to the next table.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the equity-extract pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Read errors ───────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The text layer of a page could not be loaded.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, place the library\n\
in the working directory, or install it system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// No credential was supplied for the model endpoint.
    #[error("No API key configured.\nSet GEMINI_API_KEY or pass --api-key <KEY>.")]
    MissingApiKey,

    /// The endpoint answered with a non-success HTTP status.
    #[error("Model API error: HTTP {status}\n{body}")]
    Transport { status: u16, body: String },

    /// The request never produced an HTTP status (DNS, TLS, connection reset…).
    #[error("Model API request failed: {reason}")]
    Request { reason: String },

    /// HTTP 2xx, but the response envelope lacked the expected fields.
    #[error("Parsing model response failed: {detail}")]
    Envelope { detail: String },

    /// The model's answer is not a JSON object after fence stripping.
    #[error("JSON parse error: {reason}\n--- raw model output ---\n{raw}")]
    Decode { reason: String, raw: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// True for failures that stop a single file from contributing text.
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            ExtractError::FileNotFound { .. }
                | ExtractError::PermissionDenied { .. }
                | ExtractError::NotAPdf { .. }
                | ExtractError::CorruptPdf { .. }
                | ExtractError::PasswordRequired { .. }
                | ExtractError::WrongPassword { .. }
                | ExtractError::TextExtractionFailed { .. }
                | ExtractError::PdfiumBindingFailed(_)
        )
    }
}

/// A non-fatal error for a single table preview.
#[derive(Debug, Error)]
#[error("Could not render Table {table}: {source}")]
pub struct TableRenderError {
    /// 1-based position of the table in the combined table list.
    pub table: usize,
    #[source]
    pub source: std::io::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_display_has_status_and_body() {
        let e = ExtractError::Transport {
            status: 403,
            body: "API key not valid".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("API key not valid"), "got: {msg}");
    }

    #[test]
    fn decode_display_includes_raw_text() {
        let e = ExtractError::Decode {
            reason: "expected value at line 1 column 1".into(),
            raw: "not json".into(),
        };
        assert!(e.to_string().contains("not json"));
    }

    #[test]
    fn read_failures_are_classified() {
        assert!(ExtractError::FileNotFound {
            path: "a.pdf".into()
        }
        .is_read_failure());
        assert!(ExtractError::PdfiumBindingFailed("missing".into()).is_read_failure());
        assert!(!ExtractError::MissingApiKey.is_read_failure());
        assert!(!ExtractError::Envelope {
            detail: "no candidates".into()
        }
        .is_read_failure());
    }

    #[test]
    fn table_render_error_names_table() {
        let e = TableRenderError {
            table: 4,
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"),
        };
        assert!(e.to_string().contains("Table 4"));
    }
}
