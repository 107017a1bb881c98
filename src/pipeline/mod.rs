//! Pipeline stages for PDF-to-JSON extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested alone and the model backend can be swapped without touching the
//! reader.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ reader ──▶ (flatten + prompt) ──▶ client ──▶ parse
//! (path/bytes) (pdfium + layout)               (Gemini)   (JSON object)
//! ```
//!
//! 1. [`input`]  — resolve an upload to a local PDF, spooling bytes to a temp file
//! 2. [`reader`] — per-page text via pdfium; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`layout`] — group character boxes into lines and cells to detect tables
//! 4. [`client`] — send the prompt once; the only stage with network I/O
//! 5. [`parse`]  — strip code fences and decode the answer as a JSON object
//!
//! Flattening lives on [`crate::document::Document`] and the prompt template
//! in [`crate::prompts`].

pub mod client;
pub mod input;
pub mod layout;
pub mod parse;
pub mod reader;
