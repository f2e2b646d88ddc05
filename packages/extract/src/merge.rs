//! Continuation-row merging.
//!
//! Extraction engines split a cell whose text wraps onto a second physical
//! line into two rows: the real row, followed by a nearly empty row holding
//! the wrapped text. This module folds those continuation rows back into
//! the row they belong to.

use statement_tables_table_models::{Cell, Row};

/// An em-dash that was UTF-8 encoded and then decoded as Windows-1252.
/// Statements use it as an "empty" placeholder.
pub const MISDECODED_EM_DASH: &str = "\u{e2}\u{20ac}\u{201d}";

/// Text a dataframe-based engine writes for a missing value.
pub const NAN_TEXT: &str = "nan";

/// Highest column index treated as part of the description region.
const DESCRIPTION_MAX_COL: usize = 2;

/// Maximum number of non-blank cells a continuation row may have.
const CONTINUATION_MAX_CELLS: usize = 2;

/// Whether a cell counts as empty.
///
/// Empty means `None`, whitespace-only text, or one of the placeholder
/// values engines emit for missing data.
#[must_use]
pub fn is_blank(cell: &Cell) -> bool {
    cell.as_deref().is_none_or(|text| {
        text == MISDECODED_EM_DASH || text == NAN_TEXT || text.trim().is_empty()
    })
}

/// Whether every cell in `row` is blank.
#[must_use]
pub fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(is_blank)
}

/// Folds wrapped continuation rows into the row they continue.
///
/// A row continues the previous kept row when it has at most two non-blank
/// cells, its first cell is blank, and at least one non-blank cell sits in
/// the first three columns. Its non-blank cells are appended (space
/// separated) to the same columns of the previous kept row. Consecutive
/// continuation rows all fold into the same kept row.
///
/// The result never has more rows than the input and keeps the order of
/// surviving rows. `column_count` is the table width; rows of a different
/// width are merged by their own width.
#[must_use]
pub fn merge_continuation_rows(rows: &[Row], column_count: usize) -> Vec<Row> {
    let mut kept: Vec<Row> = Vec::with_capacity(rows.len());

    for (idx, row) in rows.iter().enumerate() {
        if row.len() != column_count {
            log::trace!(
                "Row {idx} has {} cells, table has {column_count} columns",
                row.len()
            );
        }

        let filled: Vec<(usize, &str)> = row
            .iter()
            .enumerate()
            .filter(|(_, cell)| !is_blank(cell))
            .filter_map(|(col, cell)| cell.as_deref().map(|text| (col, text)))
            .collect();

        if let Some(prev) = kept
            .last_mut()
            .filter(|_| is_continuation(row, &filled))
        {
            log::trace!("Row {idx} continues the previous row");
            fold_into(prev, &filled);
        } else {
            kept.push(row.clone());
        }
    }

    kept
}

/// Appends each `(col, text)` to `prev`, skipping columns `prev` lacks.
fn fold_into(prev: &mut Row, filled: &[(usize, &str)]) {
    for &(col, text) in filled {
        let Some(target) = prev.get_mut(col) else {
            continue;
        };
        let merged = if is_blank(target) {
            text.to_owned()
        } else {
            format!("{} {text}", target.as_deref().unwrap_or_default())
        };
        *target = Some(merged);
    }
}

fn is_continuation(row: &[Cell], filled: &[(usize, &str)]) -> bool {
    filled.len() <= CONTINUATION_MAX_CELLS
        && row.first().is_none_or(is_blank)
        && filled.iter().any(|&(col, _)| col <= DESCRIPTION_MAX_COL)
}
