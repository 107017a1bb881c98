//! Table detection from positioned glyphs.
//!
//! pdfium exposes a page's text layer as individual characters with bounding
//! boxes, but has no notion of tables. This module rebuilds lines and
//! column-aligned cell runs from that geometry. It deliberately knows nothing
//! about pdfium so it can be unit-tested with synthetic glyphs.
//!
//! ## Heuristic
//!
//! ```text
//! glyphs ──▶ lines ──▶ cells ──▶ runs of multi-cell lines ──▶ columns ──▶ Table
//! ```
//!
//! A line is split into cells wherever the horizontal gap between glyphs is
//! wide compared to the font height. Two or more consecutive lines that each
//! have at least two cells form a table; the column slots come from merging
//! the overlapping horizontal extents of all cells in the run.

use crate::document::Table;

/// One character from the PDF text layer, in PDF user space (y grows upward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Glyph {
    fn height(&self) -> f32 {
        (self.top - self.bottom).abs()
    }

    fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// Tunables for [`detect_tables`], all relative to the font height so they
/// work across font sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Max distance between a glyph's centre and its line's centre. Default: 0.5.
    pub line_tolerance: f32,
    /// Gap that starts a new cell. Default: 1.2.
    pub column_gap: f32,
    /// Gap that inserts a space inside a cell. Default: 0.15.
    pub word_gap: f32,
    /// Minimum consecutive multi-cell lines that make a table. Default: 2.
    pub min_rows: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            line_tolerance: 0.5,
            column_gap: 1.2,
            word_gap: 0.15,
            min_rows: 2,
        }
    }
}

/// A horizontally contiguous run of glyphs on one line.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    text: String,
    left: f32,
    right: f32,
}

/// Detect tables on one page.
pub fn detect_tables(glyphs: &[Glyph], options: &LayoutOptions) -> Vec<Table> {
    let lines: Vec<Vec<Cell>> = group_lines(glyphs, options)
        .into_iter()
        .map(|line| split_cells(&line, options))
        .filter(|cells| !cells.is_empty())
        .collect();

    let mut tables = Vec::new();
    let mut run: Vec<&Vec<Cell>> = Vec::new();

    for line in &lines {
        if line.len() >= 2 {
            run.push(line);
        } else {
            flush_run(&mut run, &mut tables, options);
        }
    }
    flush_run(&mut run, &mut tables, options);

    tables
}

fn flush_run(run: &mut Vec<&Vec<Cell>>, tables: &mut Vec<Table>, options: &LayoutOptions) {
    if run.len() >= options.min_rows {
        if let Some(table) = build_table(run) {
            tables.push(table);
        }
    }
    run.clear();
}

/// Group non-whitespace glyphs into lines, top of the page first.
fn group_lines(glyphs: &[Glyph], options: &LayoutOptions) -> Vec<Vec<Glyph>> {
    let mut sorted: Vec<Glyph> = glyphs
        .iter()
        .filter(|g| !g.ch.is_whitespace() && g.height() > 0.0)
        .copied()
        .collect();
    sorted.sort_by(|a, b| b.center_y().total_cmp(&a.center_y()));

    let mut lines: Vec<Vec<Glyph>> = Vec::new();
    let mut line_center = f32::NAN;

    for glyph in sorted {
        let tolerance = glyph.height() * options.line_tolerance;
        match lines.last_mut() {
            Some(line) if (glyph.center_y() - line_center).abs() <= tolerance => {
                line.push(glyph);
                line_center =
                    line.iter().map(Glyph::center_y).sum::<f32>() / line.len() as f32;
            }
            _ => {
                line_center = glyph.center_y();
                lines.push(vec![glyph]);
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    lines
}

/// Split one line (sorted by `left`) into cells at wide gaps.
fn split_cells(line: &[Glyph], options: &LayoutOptions) -> Vec<Cell> {
    let Some(first) = line.first() else {
        return Vec::new();
    };
    let height = median_height(line);
    let cell_gap = height * options.column_gap;
    let space_gap = height * options.word_gap;

    let mut cells = Vec::new();
    let mut current = Cell {
        text: first.ch.to_string(),
        left: first.left,
        right: first.right,
    };

    for glyph in &line[1..] {
        let gap = glyph.left - current.right;
        if gap > cell_gap {
            cells.push(std::mem::replace(
                &mut current,
                Cell {
                    text: glyph.ch.to_string(),
                    left: glyph.left,
                    right: glyph.right,
                },
            ));
            continue;
        }
        if gap > space_gap {
            current.text.push(' ');
        }
        current.text.push(glyph.ch);
        current.right = current.right.max(glyph.right);
    }
    cells.push(current);
    cells
}

fn median_height(line: &[Glyph]) -> f32 {
    let mut heights: Vec<f32> = line.iter().map(Glyph::height).collect();
    heights.sort_by(f32::total_cmp);
    heights[heights.len() / 2]
}

/// Assign the cells of a run of lines to merged column slots.
fn build_table(run: &[&Vec<Cell>]) -> Option<Table> {
    let mut extents: Vec<(f32, f32)> = run
        .iter()
        .flat_map(|line| line.iter().map(|c| (c.left, c.right)))
        .collect();
    extents.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut columns: Vec<(f32, f32)> = Vec::new();
    for (left, right) in extents {
        match columns.last_mut() {
            Some(col) if left <= col.1 => col.1 = col.1.max(right),
            _ => columns.push((left, right)),
        }
    }
    if columns.len() < 2 {
        return None;
    }

    let rows = run
        .iter()
        .map(|line| {
            let mut row: Vec<Option<String>> = vec![None; columns.len()];
            for cell in line.iter() {
                let slot = columns
                    .iter()
                    .position(|&(l, r)| cell.left >= l && cell.left <= r)
                    .unwrap_or(columns.len() - 1);
                match &mut row[slot] {
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(&cell.text);
                    }
                    empty => *empty = Some(cell.text.clone()),
                }
            }
            row
        })
        .collect();

    Some(Table::new(rows))
}
