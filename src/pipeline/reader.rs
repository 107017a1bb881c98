//! PDF reading: per-page text and table detection via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations.
//!
//! Only text-layer access lives here. The geometry that turns characters into
//! tables is in [`crate::pipeline::layout`].

use crate::document::{Document, Page};
use crate::error::ExtractError;
use crate::pipeline::layout::{self, Glyph, LayoutOptions};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming a directory that contains libpdfium.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Read every page of a PDF into a [`Document`].
///
/// `name` is the display name recorded on the document (usually the file name
/// of the upload, which may differ from the on-disk temp path).
pub async fn read_pdf(
    pdf_path: &Path,
    name: &str,
    password: Option<&str>,
    layout: LayoutOptions,
) -> Result<Document, ExtractError> {
    let path = pdf_path.to_path_buf();
    let name = name.to_string();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        read_pdf_blocking(&path, &name, password.as_deref(), &layout)
    })
    .await
    .map_err(|e| ExtractError::Internal(format!("Read task panicked: {}", e)))?
}

/// Bind to libpdfium: `$PDFIUM_LIB_PATH`, then the working directory, then
/// the system library path.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let from_env = std::env::var(PDFIUM_LIB_PATH_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    let bindings = match from_env {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir)),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    }
    .or_else(|_| Pdfium::bind_to_system_library())
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of [`read_pdf`].
fn read_pdf_blocking(
    pdf_path: &Path,
    name: &str,
    password: Option<&str>,
    layout: &LayoutOptions,
) -> Result<Document, ExtractError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| open_error(pdf_path, password, e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("{}: {} pages", name, total_pages);

    let mut out = Vec::with_capacity(total_pages);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        let text_layer = page
            .text()
            .map_err(|e| ExtractError::TextExtractionFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?;

        let text = page_text(text_layer.all());

        let glyphs: Vec<Glyph> = text_layer
            .chars()
            .iter()
            .filter_map(|c| {
                let ch = c.unicode_string()?.chars().next()?;
                let bounds = c.loose_bounds().ok()?;
                Some(Glyph {
                    ch,
                    left: bounds.left().value,
                    right: bounds.right().value,
                    bottom: bounds.bottom().value,
                    top: bounds.top().value,
                })
            })
            .collect();

        let tables = layout::detect_tables(&glyphs, layout);
        debug!(
            "{}: page {} → {} chars, {} tables",
            name,
            page_num,
            glyphs.len(),
            tables.len()
        );

        out.push(Page {
            number: page_num,
            text,
            tables,
        });
    }

    Ok(Document::new(name, out))
}

/// Map a pdfium open failure onto the read-failure variants.
fn open_error(pdf_path: &Path, password: Option<&str>, e: PdfiumError) -> ExtractError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            ExtractError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            ExtractError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// pdfium joins lines with `\r\n`; pages carry `\n` line breaks, and a page
/// with only whitespace has no text.
fn page_text(raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        return None;
    }
    if raw.contains('\r') {
        Some(raw.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Some(raw)
    }
}
