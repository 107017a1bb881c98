//! # equity-extract
//!
//! Pull ratings, price targets and revenue/EBITDA/PAT figures out of
//! equity-research PDFs with a large language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF(s)
//!  │
//!  ├─ 1. Input    resolve a local file, or spool uploaded bytes to a temp file
//!  ├─ 2. Read     per-page text via pdfium (spawn_blocking) + table heuristic
//!  ├─ 3. Flatten  "--- Page N Text ---" / "--- Page N Table M ---" sections
//!  ├─ 4. Prompt   field schema + label rules + the flattened text (editable)
//!  ├─ 5. Model    one Gemini generateContent call, no retry
//!  ├─ 6. Parse    strip code fences, decode a JSON object
//!  └─ 7. Output   printed mapping, financial_data.json, table previews
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use equity_extract::{ExtractionConfig, Session, Upload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!
//!     let mut session = Session::new(config);
//!     session.upload(&[Upload::from_path("research.pdf")]).await;
//!     let data = session.submit().await?;
//!     println!("{}", serde_json::to_string_pretty(&data)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `equity-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! equity-extract = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! The reader binds to libpdfium at runtime: `$PDFIUM_LIB_PATH` first, then
//! the working directory, then the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use document::{combine_text, Document, Page, Table};
pub use error::{ExtractError, TableRenderError};
pub use extract::{
    extract, extract_files, extract_sync, extract_with, read_document, read_documents,
    resolve_client, JsonArtifact, ReadOutcome,
};
pub use pipeline::client::{GeminiClient, ModelClient};
pub use pipeline::input::Upload;
pub use pipeline::layout::LayoutOptions;
pub use pipeline::parse::{parse_response, strip_code_fences, FinancialData};
pub use present::{preview_tables, write_preview, NumericChart, TablePreview};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{build_prompt, missing_fields, FIELD_NAMES};
pub use session::{ExtractionRequest, ExtractionState, Session};
