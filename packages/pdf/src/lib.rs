#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! External table-extraction engines for PDF statements.
//!
//! Page layout analysis and table geometry detection are not done here.
//! They are delegated to external programs (by default `tabula-java` in
//! lattice and stream modes) that print the tables they find as JSON. This
//! crate runs those programs and adapts their output into [`RawGrid`]s.
//!
//! The orchestration layer only sees the [`TableEngine`] trait, so any
//! engine that can turn a PDF path into row/column grids can be plugged
//! into the fallback sequence.

pub mod command;
pub mod output;

use std::io::Read as _;
use std::path::Path;

use statement_tables_table_models::{ExtractionMethod, Row};

/// Bytes every PDF file starts with (possibly after a little leading junk).
pub const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// How far into the file the signature may appear. Readers tolerate a
/// short preamble before the header.
const SIGNATURE_WINDOW: usize = 1024;

/// Errors specific to running an extraction engine.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine program could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        /// Program that was being started.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The engine ran but exited unsuccessfully.
    #[error("{engine} engine exited with {status}: {stderr}")]
    EngineExit {
        /// Engine name.
        engine: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The engine printed something that is not a JSON table list.
    #[error("Invalid engine output: {0}")]
    Output(#[from] serde_json::Error),

    /// The input does not look like a PDF.
    #[error("Not a PDF file: {0}")]
    NotAPdf(String),
}

/// One table as returned by an engine, before any cleanup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    /// Rows of cells. Exactly-empty engine text is already `None`.
    pub rows: Vec<Row>,
    /// 1-based page number, if the engine reports one.
    pub page: Option<u32>,
    /// Confidence in `0.0..=1.0`, if the engine reports one.
    pub accuracy: Option<f64>,
}

impl RawGrid {
    /// Creates a grid from rows of text, mapping `""` to `None`.
    #[must_use]
    pub fn from_text_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| output::cell(s.into())).collect())
            .collect();
        Self {
            rows,
            page: None,
            accuracy: None,
        }
    }

    /// Sets the page number.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the confidence score.
    #[must_use]
    pub const fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }
}

/// A table-extraction strategy that turns a PDF into raw grids.
///
/// Implementations are blocking and may be slow; callers in async contexts
/// must run them on a blocking thread.
pub trait TableEngine: Send + Sync {
    /// Short engine name used in table IDs and diagnostics (e.g.
    /// `"lattice"`).
    fn name(&self) -> &str;

    /// Which kind of extraction this engine performs.
    fn method(&self) -> ExtractionMethod;

    /// Reads every table on every page of the PDF at `pdf_path`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] if the engine cannot be run or its output
    /// cannot be parsed.
    fn read_tables(&self, pdf_path: &Path) -> Result<Vec<RawGrid>, PdfError>;
}

/// Checks that `bytes` carry a PDF header near the start.
///
/// # Errors
///
/// Returns [`PdfError::NotAPdf`] if the signature is missing.
pub fn check_pdf_signature(bytes: &[u8]) -> Result<(), PdfError> {
    let window = &bytes[..bytes.len().min(SIGNATURE_WINDOW)];
    if window
        .windows(PDF_SIGNATURE.len())
        .any(|w| w == PDF_SIGNATURE)
    {
        Ok(())
    } else {
        Err(PdfError::NotAPdf(format!(
            "missing %PDF- header in the first {} bytes",
            window.len()
        )))
    }
}

/// Checks that the file at `path` is readable and carries a PDF header.
///
/// # Errors
///
/// Returns [`PdfError::Io`] if the file cannot be read, or
/// [`PdfError::NotAPdf`] if the signature is missing.
pub fn ensure_pdf_file(path: &Path) -> Result<(), PdfError> {
    let mut head = Vec::with_capacity(SIGNATURE_WINDOW);
    std::fs::File::open(path)?
        .take(SIGNATURE_WINDOW as u64)
        .read_to_end(&mut head)?;
    check_pdf_signature(&head)
}
