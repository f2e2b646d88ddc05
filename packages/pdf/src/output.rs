//! Parsing of engine JSON output into [`RawGrid`]s.
//!
//! Engines print a JSON array with one object per detected table. Two cell
//! shapes are accepted:
//!
//! - `tabula-java --format JSON`: each cell is an object with a `text` field
//!   plus geometry, and the table carries `page_number`
//! - plain bridges (e.g. a Camelot wrapper): each cell is a string, number,
//!   or `null`, and the table carries `page` and `accuracy`
//!
//! Unknown fields are ignored.

use serde::Deserialize;
use statement_tables_table_models::{Cell, Row};

use crate::{PdfError, RawGrid};

#[derive(Debug, Deserialize)]
struct JsonTable {
    #[serde(default, alias = "page_number")]
    page: Option<u32>,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    data: Vec<Vec<JsonCell>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonCell {
    Text(String),
    Number(serde_json::Number),
    Located { text: Option<String> },
    Empty,
}

impl From<JsonCell> for Cell {
    fn from(value: JsonCell) -> Self {
        match value {
            JsonCell::Text(text) | JsonCell::Located { text: Some(text) } => cell(text),
            JsonCell::Number(n) => Some(n.to_string()),
            JsonCell::Located { text: None } | JsonCell::Empty => None,
        }
    }
}

/// Maps exactly-empty engine text to `None`.
///
/// Whitespace and placeholder values are kept as text; deciding whether
/// they count as blank is left to the post-processing pipeline.
#[must_use]
pub fn cell(text: String) -> Cell {
    if text.is_empty() { None } else { Some(text) }
}

/// Brings an engine confidence score into `0.0..=1.0`.
///
/// Some engines report a percentage; anything above `1.0` is treated as
/// one. Non-finite or negative scores are dropped.
#[must_use]
pub fn normalize_accuracy(raw: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    let score = if raw > 1.0 { raw / 100.0 } else { raw };
    Some(score.min(1.0))
}

/// Parses an engine's standard output into grids.
///
/// Blank output (only whitespace) means the engine found no tables.
///
/// # Errors
///
/// Returns [`PdfError::Output`] if the output is not a JSON table list.
pub fn parse_tables(stdout: &[u8]) -> Result<Vec<RawGrid>, PdfError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let tables: Vec<JsonTable> = serde_json::from_slice(stdout)?;

    Ok(tables
        .into_iter()
        .map(|table| RawGrid {
            rows: table
                .data
                .into_iter()
                .map(|row| row.into_iter().map(Cell::from).collect::<Row>())
                .collect(),
            page: table.page.filter(|&p| p >= 1),
            accuracy: table.accuracy.and_then(normalize_accuracy),
        })
        .collect())
}
