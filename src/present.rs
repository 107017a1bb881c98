//! Terminal previews of detected tables.
//!
//! Every table that has at least one non-blank cell is shown as a grid with
//! 0-based column headers. When some of its cells read as numbers, a line
//! chart follows: one sparkline per numeric column, all on a shared scale.
//!
//! Rendering a preview can only fail on I/O. That failure is reported per
//! table as a [`TableRenderError`] so the caller can warn and carry on.

use crate::document::Table;
use crate::error::TableRenderError;
use std::io::{self, Write};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// A table selected for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePreview<'a> {
    /// 1-based position in the combined table list, blank tables included.
    pub index: usize,
    pub table: &'a Table,
    pub chart: Option<NumericChart>,
}

/// The numeric part of a table, ready to plot.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericChart {
    /// 0-based indices of the rows that hold at least one number.
    pub rows: Vec<usize>,
    /// One series per column that holds at least one number.
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// 0-based column index in the source table.
    pub column: usize,
    /// One value per entry of [`NumericChart::rows`].
    pub values: Vec<Option<f64>>,
}

impl NumericChart {
    /// Smallest and largest value across all series.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().flatten().copied())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Render one series as a sparkline; gaps are spaces.
    pub fn sparkline(&self, series: &Series) -> String {
        let Some((lo, hi)) = self.bounds() else {
            return String::new();
        };
        series
            .values
            .iter()
            .map(|v| match v {
                None => ' ',
                Some(_) if hi <= lo => SPARK_LEVELS[SPARK_LEVELS.len() / 2],
                Some(v) => {
                    let top = (SPARK_LEVELS.len() - 1) as f64;
                    let level = ((v - lo) / (hi - lo) * top).round() as usize;
                    SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
                }
            })
            .collect()
    }
}

/// Read a cell as a number: trimmed text that parses to a finite `f64`.
pub fn coerce_numeric(cell: Option<&str>) -> Option<f64> {
    cell.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Keep the numeric columns and rows of `table`, or `None` if there are none.
pub fn numeric_chart(table: &Table) -> Option<NumericChart> {
    let width = table.column_count();
    let grid: Vec<Vec<Option<f64>>> = table
        .rows
        .iter()
        .map(|row| {
            (0..width)
                .map(|c| coerce_numeric(row.get(c).and_then(|cell| cell.as_deref())))
                .collect()
        })
        .collect();

    let columns: Vec<usize> = (0..width)
        .filter(|&c| grid.iter().any(|row| row[c].is_some()))
        .collect();
    let rows: Vec<usize> = (0..grid.len())
        .filter(|&r| columns.iter().any(|&c| grid[r][c].is_some()))
        .collect();

    if columns.is_empty() || rows.is_empty() {
        return None;
    }

    let series = columns
        .into_iter()
        .map(|column| Series {
            column,
            values: rows.iter().map(|&r| grid[r][column]).collect(),
        })
        .collect();
    Some(NumericChart { rows, series })
}

/// Select the tables worth showing and attach their charts.
pub fn preview_tables<'a>(tables: impl IntoIterator<Item = &'a Table>) -> Vec<TablePreview<'a>> {
    tables
        .into_iter()
        .enumerate()
        .filter(|(_, table)| !table.is_blank())
        .map(|(i, table)| TablePreview {
            index: i + 1,
            table,
            chart: numeric_chart(table),
        })
        .collect()
}

/// Write one preview: heading, grid, then the chart if there is one.
pub fn write_preview<W: Write>(
    out: &mut W,
    preview: &TablePreview<'_>,
) -> Result<(), TableRenderError> {
    render(out, preview).map_err(|source| TableRenderError {
        table: preview.index,
        source,
    })
}

fn render<W: Write>(out: &mut W, preview: &TablePreview<'_>) -> io::Result<()> {
    let table = preview.table;
    let width = table.column_count();

    let mut widths: Vec<usize> = (0..width).map(|c| c.to_string().len()).collect();
    for row in &table.rows {
        for (c, cell) in row.iter().enumerate() {
            let len = cell.as_deref().map_or(0, |s| s.chars().count());
            widths[c] = widths[c].max(len);
        }
    }
    let label_width = table.rows.len().saturating_sub(1).to_string().len();

    writeln!(out, "Table {}", preview.index)?;

    write!(out, "{:>label_width$}", "")?;
    for (c, &w) in widths.iter().enumerate() {
        write!(out, " | {:<w$}", c)?;
    }
    writeln!(out)?;

    for (r, row) in table.rows.iter().enumerate() {
        write!(out, "{:>label_width$}", r)?;
        for (c, &w) in widths.iter().enumerate() {
            let cell = row.get(c).and_then(|cell| cell.as_deref()).unwrap_or("");
            write!(out, " | {:<w$}", cell)?;
        }
        writeln!(out)?;
    }

    if let Some(chart) = &preview.chart {
        if let Some((lo, hi)) = chart.bounds() {
            writeln!(out, "Chart ({} rows, range {} to {})", chart.rows.len(), lo, hi)?;
        }
        for series in &chart.series {
            writeln!(
                out,
                "  {:>w$} {}",
                series.column,
                chart.sparkline(series),
                w = label_width.max(2)
            )?;
        }
    }
    writeln!(out)?;
    out.flush()
}
