//! Data model produced by the document reader.
//!
//! A [`Document`] is built once per input file and never mutated afterwards.
//! Its [`Document::flatten`] output is the exact text the model sees, so the
//! section headers below are part of the prompt contract: changing them
//! changes what the model is asked to read.

use serde::{Deserialize, Serialize};

/// Substituted for a page that yields no text.
pub const NO_TEXT_PLACEHOLDER: &str = "[No text found]";

/// Separator between cells of one table row in the flattened text.
pub const CELL_SEPARATOR: &str = " | ";

/// A table detected on a page: ordered rows of optional cells.
///
/// Rows may be ragged; an absent cell (`None`) is a column slot that no text
/// fell into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// True when every cell is absent or blank after trimming.
    pub fn is_blank(&self) -> bool {
        self.rows
            .iter()
            .flatten()
            .all(|cell| cell.as_deref().map_or(true, |s| s.trim().is_empty()))
    }

    /// Render one row as `a | b | c`, absent cells as empty strings.
    pub fn render_row(row: &[Option<String>]) -> String {
        row.iter()
            .map(|cell| cell.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(CELL_SEPARATOR)
    }
}

/// One page of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number.
    pub number: usize,
    /// Extracted text; `None` when the page has no text layer.
    pub text: Option<String>,
    pub tables: Vec<Table>,
}

/// A read PDF: its display name and pages in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pages: Vec<Page>,
}

impl Document {
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            name: name.into(),
            pages,
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// All tables of the document in page order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.pages.iter().flat_map(|p| p.tables.iter())
    }

    /// Interleave page text and table content into the model input.
    ///
    /// ```text
    ///
    /// --- Page 1 Text ---
    /// <text or [No text found]>
    /// --- Page 1 Table 1 ---
    /// a | b | c
    /// ```
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        for page in &self.pages {
            let text = page
                .text
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(NO_TEXT_PLACEHOLDER);
            out.push_str(&format!("\n--- Page {} Text ---\n{}", page.number, text));

            for (t_index, table) in page.tables.iter().enumerate() {
                out.push_str(&format!(
                    "\n--- Page {} Table {} ---\n",
                    page.number,
                    t_index + 1
                ));
                for row in &table.rows {
                    out.push_str(&Table::render_row(row));
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Concatenate the flattened text of several documents, each followed by a
/// blank line, in upload order.
pub fn combine_text<'a>(documents: impl IntoIterator<Item = &'a Document>) -> String {
    let mut all_text = String::new();
    for doc in documents {
        all_text.push_str(&doc.flatten());
        all_text.push_str("\n\n");
    }
    all_text
}
