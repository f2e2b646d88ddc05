#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Table, label, and diagnostic types for PDF statement table extraction.
//!
//! These types are shared by the engine adapters, the post-processing
//! pipeline, and the HTTP layer. A [`RawTable`] is built once per detected
//! table per request and never outlives that request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A single cell value. `None` is an empty or missing cell.
///
/// Numeric-looking text stays a string; no coercion happens anywhere in the
/// pipeline.
pub type Cell = Option<String>;

/// One row of cells, in column order.
pub type Row = Vec<Cell>;

/// Which extraction engine produced a table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Bordered/ruled table detection. Reports page numbers and a
    /// confidence score.
    PrimaryLattice,
    /// Whitespace-delimited table detection. Reports neither page numbers
    /// nor confidence.
    SecondaryStream,
}

impl ExtractionMethod {
    /// Short engine label used in table IDs (`lattice-table-0`).
    #[must_use]
    pub const fn engine_label(self) -> &'static str {
        match self {
            Self::PrimaryLattice => "lattice",
            Self::SecondaryStream => "stream",
        }
    }
}

/// The extraction strategy a caller asked for.
///
/// `camelot` and `tabula` are accepted as aliases for `primary` and
/// `secondary` so older front-ends keep working.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum RequestedMethod {
    /// Primary engine first, secondary only if the primary found nothing.
    #[default]
    #[strum(to_string = "auto")]
    Auto,
    /// Primary engine only.
    #[serde(alias = "camelot")]
    #[strum(to_string = "primary", serialize = "camelot")]
    Primary,
    /// Secondary engine only.
    #[serde(alias = "tabula")]
    #[strum(to_string = "secondary", serialize = "tabula")]
    Secondary,
}

impl RequestedMethod {
    /// Whether an engine of the given kind may run under this request.
    #[must_use]
    pub const fn allows(self, method: ExtractionMethod) -> bool {
        match self {
            Self::Auto => true,
            Self::Primary => matches!(method, ExtractionMethod::PrimaryLattice),
            Self::Secondary => matches!(method, ExtractionMethod::SecondaryStream),
        }
    }
}

/// Semantic category assigned to a table from its header keywords.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum TableLabel {
    /// Positions held in an account (units, market value, book value).
    Holdings,
    /// Buys, sells, dividends, and interest on securities.
    InvestmentTransactions,
    /// Debits, credits, fees, and transfers of cash.
    CashTransactions,
    /// No rule matched.
    Unknown,
}

impl TableLabel {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Holdings,
            Self::InvestmentTransactions,
            Self::CashTransactions,
            Self::Unknown,
        ]
    }
}

/// One extracted table after blank-row removal and continuation merging.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// `"<engine>-table-<ordinal>"`, where the ordinal is the table's index
    /// in the engine output.
    pub id: String,
    /// 1-based page number (approximated by ordinal for stream tables).
    pub page: u32,
    /// Engine that produced the table.
    pub method: ExtractionMethod,
    /// Engine confidence in `0.0..=1.0`, if the engine reports one.
    pub confidence: Option<f64>,
    /// Header row.
    pub headers: Row,
    /// Data rows, in document order.
    pub rows: Vec<Row>,
    /// Always `rows.len()`.
    pub row_count: usize,
    /// Always `headers.len()`.
    pub column_count: usize,
    /// Label assigned when classification was requested.
    pub classification: Option<TableLabel>,
}

impl RawTable {
    /// Creates a table, deriving `row_count` and `column_count` from the
    /// given headers and rows.
    #[must_use]
    pub fn new(
        id: String,
        page: u32,
        method: ExtractionMethod,
        confidence: Option<f64>,
        headers: Row,
        rows: Vec<Row>,
    ) -> Self {
        let row_count = rows.len();
        let column_count = headers.len();
        Self {
            id,
            page,
            method,
            confidence,
            headers,
            rows,
            row_count,
            column_count,
            classification: None,
        }
    }

    /// Header cells as text, with empty cells as `""`.
    #[must_use]
    pub fn header_text(&self) -> Vec<&str> {
        self.headers
            .iter()
            .map(|h| h.as_deref().unwrap_or_default())
            .collect()
    }
}

/// Outcome of a single engine in the fallback sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineAttempt {
    /// Engine name (e.g. `"lattice"`).
    pub engine: String,
    /// Engine kind.
    pub method: ExtractionMethod,
    /// Whether the engine was actually invoked.
    pub attempted: bool,
    /// Number of raw tables the engine returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_count: Option<usize>,
    /// Engine failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Why the engine was not invoked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

/// Diagnostic record of one extraction request.
///
/// Built up as each engine is considered and returned on every outcome,
/// including "no tables found" and fatal failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionInfo {
    /// Name of the uploaded file.
    pub filename: String,
    /// When the request started.
    pub timestamp: DateTime<Utc>,
    /// Method the caller asked for.
    pub method: RequestedMethod,
    /// One entry per configured engine, in fallback order.
    pub engines: Vec<EngineAttempt>,
}

impl ExtractionInfo {
    /// Starts a record for `filename`, timestamped now.
    #[must_use]
    pub fn new(filename: &str, method: RequestedMethod) -> Self {
        Self {
            filename: filename.to_owned(),
            timestamp: Utc::now(),
            method,
            engines: Vec::new(),
        }
    }

    /// Records that `engine` ran and returned `count` raw tables.
    pub fn record_tables(&mut self, engine: &str, method: ExtractionMethod, count: usize) {
        self.engines.push(EngineAttempt {
            engine: engine.to_owned(),
            method,
            attempted: true,
            table_count: Some(count),
            error: None,
            skipped: None,
        });
    }

    /// Records that `engine` ran and failed.
    pub fn record_error(&mut self, engine: &str, method: ExtractionMethod, error: String) {
        self.engines.push(EngineAttempt {
            engine: engine.to_owned(),
            method,
            attempted: true,
            table_count: None,
            error: Some(error),
            skipped: None,
        });
    }

    /// Records that `engine` was not invoked, and why.
    pub fn record_skipped(&mut self, engine: &str, method: ExtractionMethod, reason: String) {
        self.engines.push(EngineAttempt {
            engine: engine.to_owned(),
            method,
            attempted: false,
            table_count: None,
            error: None,
            skipped: Some(reason),
        });
    }

    /// Engines that were actually invoked.
    pub fn attempted(&self) -> impl Iterator<Item = &EngineAttempt> {
        self.engines.iter().filter(|e| e.attempted)
    }

    /// Number of engines that failed.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.engines.iter().filter(|e| e.error.is_some()).count()
    }
}
