#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Post-processing pipeline for tables extracted from PDF statements.
//!
//! The [`Extractor`] runs an ordered list of [`TableEngine`]s with a
//! fallback policy: each engine the caller's [`RequestedMethod`] allows is
//! tried in turn until one produces at least one table. Every raw grid is
//! cleaned of blank rows, split into a header and data rows, and passed
//! through [`merge::merge_continuation_rows`]. When requested, each table
//! is then labelled by [`classify::classify_table`].
//!
//! Every outcome carries an [`ExtractionInfo`] describing which engines
//! ran, what they returned, and why any were skipped.

pub mod classify;
pub mod merge;

use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use statement_tables_pdf::{PdfError, RawGrid, TableEngine};
use statement_tables_table_models::{
    ExtractionInfo, ExtractionMethod, RawTable, RequestedMethod, Row,
};

pub use classify::{HOLDINGS_MAX_ROWS, classify_table};
pub use merge::{is_blank, merge_continuation_rows};

/// Failure outcomes of an extraction request.
///
/// Both variants carry the diagnostic record accumulated so far.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Every allowed engine ran (or failed) and none produced a table.
    #[error("No tables found in PDF")]
    NoTablesFound(Box<ExtractionInfo>),

    /// Something outside the engines went wrong (unreadable or non-PDF
    /// input, temporary file I/O).
    #[error("{source}")]
    Failed {
        /// What went wrong.
        source: PdfError,
        /// Diagnostics gathered before the failure.
        info: Box<ExtractionInfo>,
    },
}

impl ExtractError {
    fn failed(source: PdfError, info: ExtractionInfo) -> Self {
        Self::Failed {
            source,
            info: Box::new(info),
        }
    }

    /// The diagnostic record for this request.
    #[must_use]
    pub fn info(&self) -> &ExtractionInfo {
        match self {
            Self::NoTablesFound(info) | Self::Failed { info, .. } => info,
        }
    }

    /// Consumes the error, returning its diagnostic record.
    #[must_use]
    pub fn into_info(self) -> ExtractionInfo {
        match self {
            Self::NoTablesFound(info) | Self::Failed { info, .. } => *info,
        }
    }
}

/// A successful extraction: at least one table plus diagnostics.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Extracted tables, in engine output order.
    pub tables: Vec<RawTable>,
    /// What was attempted.
    pub info: ExtractionInfo,
}

/// Runs table engines in fallback order and post-processes their output.
///
/// Holds no per-request state, so one instance can be shared across
/// threads.
#[derive(Clone)]
pub struct Extractor {
    engines: Vec<Arc<dyn TableEngine>>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field(
                "engines",
                &self.engines.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Extractor {
    /// Creates an extractor that tries `engines` in the given order.
    #[must_use]
    pub fn new(engines: Vec<Arc<dyn TableEngine>>) -> Self {
        Self { engines }
    }

    /// Creates the standard two-tier extractor: `primary` first, then
    /// `secondary` when the primary finds nothing.
    #[must_use]
    pub fn with_fallback(
        primary: impl TableEngine + 'static,
        secondary: impl TableEngine + 'static,
    ) -> Self {
        Self::new(vec![Arc::new(primary), Arc::new(secondary)])
    }

    /// The configured engines, in fallback order.
    #[must_use]
    pub fn engines(&self) -> &[Arc<dyn TableEngine>] {
        &self.engines
    }

    /// Extracts tables from the PDF at `pdf_path`.
    ///
    /// `filename` is only used for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::NoTablesFound`] if no allowed engine
    /// produced a table, or [`ExtractError::Failed`] if the file cannot be
    /// read or is not a PDF.
    pub fn extract(
        &self,
        pdf_path: &Path,
        filename: &str,
        method: RequestedMethod,
        classify: bool,
    ) -> Result<Extraction, ExtractError> {
        let info = ExtractionInfo::new(filename, method);
        if let Err(e) = statement_tables_pdf::ensure_pdf_file(pdf_path) {
            log::warn!("Rejecting {filename}: {e}");
            return Err(ExtractError::failed(e, info));
        }
        self.run(pdf_path, info, classify)
    }

    /// Extracts tables from an in-memory PDF.
    ///
    /// The bytes are written to a temporary `.pdf` file for the engines,
    /// which is removed before this returns.
    ///
    /// # Errors
    ///
    /// Same as [`Self::extract`].
    pub fn extract_bytes(
        &self,
        bytes: &[u8],
        filename: &str,
        method: RequestedMethod,
        classify: bool,
    ) -> Result<Extraction, ExtractError> {
        self.extract_bytes_with_info(bytes, ExtractionInfo::new(filename, method), classify)
    }

    /// Like [`Self::extract_bytes`], filling in a record the caller already
    /// started, so its timestamp marks when the request arrived.
    ///
    /// # Errors
    ///
    /// Same as [`Self::extract`].
    pub fn extract_bytes_with_info(
        &self,
        bytes: &[u8],
        info: ExtractionInfo,
        classify: bool,
    ) -> Result<Extraction, ExtractError> {
        let filename = info.filename.clone();
        if let Err(e) = statement_tables_pdf::check_pdf_signature(bytes) {
            log::warn!("Rejecting {filename}: {e}");
            return Err(ExtractError::failed(e, info));
        }

        let staged = match stage_pdf(bytes) {
            Ok(file) => file,
            Err(e) => {
                log::error!("Failed to stage {filename} for extraction: {e}");
                return Err(ExtractError::failed(e, info));
            }
        };

        log::debug!(
            "Staged {} bytes of {filename} at {}",
            bytes.len(),
            staged.path().display()
        );

        self.run(staged.path(), info, classify)
    }

    fn run(
        &self,
        pdf_path: &Path,
        mut info: ExtractionInfo,
        classify: bool,
    ) -> Result<Extraction, ExtractError> {
        let requested = info.method;
        let mut tables: Vec<RawTable> = Vec::new();

        for engine in &self.engines {
            let name = engine.name();
            let kind = engine.method();

            if !requested.allows(kind) {
                info.record_skipped(name, kind, format!("not requested by method '{requested}'"));
                continue;
            }
            if !tables.is_empty() {
                info.record_skipped(
                    name,
                    kind,
                    "an earlier engine already produced tables".to_string(),
                );
                continue;
            }

            log::info!("Trying {name} extraction on {}...", info.filename);
            match engine.read_tables(pdf_path) {
                Ok(grids) => {
                    log::info!("{name} extracted {} tables", grids.len());
                    info.record_tables(name, kind, grids.len());
                    tables.extend(
                        grids
                            .into_iter()
                            .enumerate()
                            .filter_map(|(ordinal, grid)| table_from_grid(kind, ordinal, grid)),
                    );
                }
                Err(e) => {
                    log::warn!("{name} extraction failed: {e}");
                    info.record_error(name, kind, e.to_string());
                }
            }
        }

        if tables.is_empty() {
            log::info!("No tables found in {}", info.filename);
            return Err(ExtractError::NoTablesFound(Box::new(info)));
        }

        if classify {
            for table in &mut tables {
                let label = classify_table(&table.header_text(), table.row_count);
                log::debug!("Classified {} as {label}", table.id);
                table.classification = Some(label);
            }
        }

        Ok(Extraction { tables, info })
    }
}

/// Writes `bytes` to a temporary file with a `.pdf` suffix.
fn stage_pdf(bytes: &[u8]) -> Result<tempfile::NamedTempFile, PdfError> {
    let mut file = tempfile::Builder::new()
        .prefix("statement-tables-")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

/// Turns one engine grid into a [`RawTable`].
///
/// Blank rows are dropped; the first remaining row is the header and the
/// rest are merged data rows. Returns `None` if nothing remains. Stream
/// grids also need at least one data row, since that engine reports a
/// header for any text region it detects.
fn table_from_grid(method: ExtractionMethod, ordinal: usize, grid: RawGrid) -> Option<RawTable> {
    let mut rows = grid
        .rows
        .into_iter()
        .filter(|row| !merge::is_blank_row(row));
    let headers: Row = rows.next()?;
    let data: Vec<Row> = rows.collect();
    if data.is_empty() && method == ExtractionMethod::SecondaryStream {
        log::debug!("Skipping stream-table-{ordinal}: header only");
        return None;
    }
    let data = merge_continuation_rows(&data, headers.len());

    let ordinal_page = u32::try_from(ordinal + 1).unwrap_or(u32::MAX);
    let (page, confidence) = match method {
        ExtractionMethod::PrimaryLattice => (grid.page.unwrap_or(ordinal_page), grid.accuracy),
        ExtractionMethod::SecondaryStream => (ordinal_page, None),
    };

    Some(RawTable::new(
        format!("{}-table-{ordinal}", method.engine_label()),
        page,
        method,
        confidence,
        headers,
        data,
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use statement_tables_table_models::TableLabel;

    use super::*;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

    /// Engine that returns canned grids (or an error) and counts calls.
    struct FakeEngine {
        name: &'static str,
        method: ExtractionMethod,
        result: Result<Vec<RawGrid>, String>,
        calls: AtomicUsize,
    }

    impl FakeEngine {
        fn lattice(result: Result<Vec<RawGrid>, String>) -> Arc<Self> {
            Arc::new(Self {
                name: "lattice",
                method: ExtractionMethod::PrimaryLattice,
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn stream(result: Result<Vec<RawGrid>, String>) -> Arc<Self> {
            Arc::new(Self {
                name: "stream",
                method: ExtractionMethod::SecondaryStream,
                result,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TableEngine for FakeEngine {
        fn name(&self) -> &str {
            self.name
        }

        fn method(&self) -> ExtractionMethod {
            self.method
        }

        fn read_tables(&self, pdf_path: &Path) -> Result<Vec<RawGrid>, PdfError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(pdf_path.exists(), "engine should see the staged PDF");
            self.result.clone().map_err(|stderr| PdfError::EngineExit {
                engine: self.name.to_string(),
                status: "exit status: 1".to_string(),
                stderr,
            })
        }
    }

    fn extractor(primary: &Arc<FakeEngine>, secondary: &Arc<FakeEngine>) -> Extractor {
        Extractor::new(vec![
            Arc::clone(primary) as Arc<dyn TableEngine>,
            Arc::clone(secondary) as Arc<dyn TableEngine>,
        ])
    }

    fn holdings_grid() -> RawGrid {
        RawGrid::from_text_rows([
            ["Security", "Units", "Market Value"],
            ["", "", ""],
            ["ACME CORP", "100", "1,250.00"],
            ["", "COMMON", ""],
            ["GLOBEX", "5", "20.00"],
        ])
        .with_page(2)
        .with_accuracy(0.97)
    }

    fn cash_grid() -> RawGrid {
        RawGrid::from_text_rows([
            ["Date", "Description", "Debit", "Credit", "Balance"],
            ["01/02", "Transfer", "", "500.00", "500.00"],
        ])
    }

    #[test]
    fn primary_tables_skip_the_secondary_engine() {
        let primary = FakeEngine::lattice(Ok(vec![holdings_grid()]));
        let secondary = FakeEngine::stream(Ok(vec![cash_grid()]));

        let result = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Auto, false)
            .unwrap();

        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
        assert_eq!(result.tables.len(), 1);

        let table = &result.tables[0];
        assert_eq!(table.id, "lattice-table-0");
        assert_eq!(table.page, 2);
        assert_eq!(table.method, ExtractionMethod::PrimaryLattice);
        assert_eq!(table.confidence, Some(0.97));
        assert_eq!(table.header_text(), vec!["Security", "Units", "Market Value"]);
        assert_eq!(table.row_count, 2);
        assert_eq!(table.column_count, 3);
        assert_eq!(table.rows[0][0].as_deref(), Some("ACME CORP"));
        assert_eq!(table.rows[0][1].as_deref(), Some("100 COMMON"));
        assert!(table.classification.is_none());

        assert_eq!(result.info.engines.len(), 2);
        assert_eq!(result.info.engines[0].table_count, Some(1));
        assert!(!result.info.engines[1].attempted);
        assert!(result.info.engines[1].skipped.is_some());
    }

    #[test]
    fn empty_primary_falls_back_to_secondary_once() {
        let primary = FakeEngine::lattice(Ok(Vec::new()));
        let secondary = FakeEngine::stream(Ok(vec![
            RawGrid::from_text_rows([[""; 5]]),
            cash_grid().with_page(7).with_accuracy(0.5),
        ]));

        let result = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Auto, false)
            .unwrap();

        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
        assert_eq!(result.tables.len(), 1);

        let table = &result.tables[0];
        assert_eq!(table.id, "stream-table-1");
        assert_eq!(table.page, 2, "stream pages come from the table ordinal");
        assert_eq!(table.confidence, None);
        assert_eq!(table.method, ExtractionMethod::SecondaryStream);

        assert_eq!(result.info.engines[0].table_count, Some(0));
        assert_eq!(result.info.engines[1].table_count, Some(2));
    }

    #[test]
    fn primary_failure_is_recorded_and_fallback_continues() {
        let primary = FakeEngine::lattice(Err("no ruling lines".to_string()));
        let secondary = FakeEngine::stream(Ok(vec![cash_grid()]));

        let result = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Auto, true)
            .unwrap();

        assert_eq!(result.tables.len(), 1);
        assert_eq!(
            result.tables[0].classification,
            Some(TableLabel::CashTransactions)
        );
        let error = result.info.engines[0].error.as_deref().unwrap();
        assert!(error.contains("no ruling lines"));
    }

    #[test]
    fn both_engines_failing_reports_two_errors() {
        let primary = FakeEngine::lattice(Err("lattice crashed".to_string()));
        let secondary = FakeEngine::stream(Err("stream crashed".to_string()));

        let err = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Auto, false)
            .unwrap_err();

        assert!(matches!(err, ExtractError::NoTablesFound(_)));
        let info = err.info();
        assert_eq!(info.error_count(), 2);
        assert!(info.engines.iter().all(|e| e.table_count.is_none()));
        assert_eq!(info.filename, "statement.pdf");
    }

    #[test]
    fn primary_only_never_runs_secondary() {
        let primary = FakeEngine::lattice(Ok(Vec::new()));
        let secondary = FakeEngine::stream(Ok(vec![cash_grid()]));

        let err = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Primary, false)
            .unwrap_err();

        assert!(matches!(err, ExtractError::NoTablesFound(_)));
        assert_eq!(secondary.calls(), 0);
        let skipped = err.info().engines[1].skipped.as_deref().unwrap();
        assert!(skipped.contains("primary"));
    }

    #[test]
    fn secondary_only_skips_primary() {
        let primary = FakeEngine::lattice(Ok(vec![holdings_grid()]));
        let secondary = FakeEngine::stream(Ok(vec![cash_grid()]));

        let result = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Secondary, false)
            .unwrap();

        assert_eq!(primary.calls(), 0);
        assert_eq!(secondary.calls(), 1);
        assert_eq!(result.tables[0].id, "stream-table-0");
        assert!(!result.info.engines[0].attempted);
    }

    #[test]
    fn classification_labels_every_table() {
        let primary = FakeEngine::lattice(Ok(vec![holdings_grid(), cash_grid().with_page(3)]));
        let secondary = FakeEngine::stream(Ok(Vec::new()));

        let result = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Auto, true)
            .unwrap();

        let labels: Vec<_> = result.tables.iter().map(|t| t.classification).collect();
        assert_eq!(
            labels,
            vec![Some(TableLabel::Holdings), Some(TableLabel::CashTransactions)]
        );
    }

    #[test]
    fn primary_header_only_table_is_kept() {
        let primary = FakeEngine::lattice(Ok(vec![
            RawGrid::from_text_rows([["Date", "Amount"], ["nan", " "]]).with_page(1),
        ]));
        let secondary = FakeEngine::stream(Ok(Vec::new()));

        let result = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Auto, false)
            .unwrap();

        assert_eq!(result.tables[0].row_count, 0);
        assert!(result.tables[0].rows.is_empty());
        assert_eq!(secondary.calls(), 0);
    }

    #[test]
    fn caller_started_record_keeps_its_timestamp() {
        let primary = FakeEngine::lattice(Ok(vec![holdings_grid()]));
        let secondary = FakeEngine::stream(Ok(Vec::new()));
        let info = ExtractionInfo::new("statement.pdf", RequestedMethod::Auto);
        let started = info.timestamp;

        let result = extractor(&primary, &secondary)
            .extract_bytes_with_info(PDF, info, false)
            .unwrap();

        assert_eq!(result.info.timestamp, started);
        assert_eq!(result.info.filename, "statement.pdf");
        assert_eq!(result.info.engines.len(), 2);
    }

    #[test]
    fn secondary_header_only_grid_is_not_a_table() {
        let primary = FakeEngine::lattice(Ok(Vec::new()));
        let secondary = FakeEngine::stream(Ok(vec![RawGrid::from_text_rows([
            ["Date", "Description", "Amount"],
            ["", "nan", " "],
        ])]));

        let err = extractor(&primary, &secondary)
            .extract_bytes(PDF, "statement.pdf", RequestedMethod::Auto, false)
            .unwrap_err();

        assert!(matches!(err, ExtractError::NoTablesFound(_)));
        assert_eq!(secondary.calls(), 1);
        assert_eq!(err.info().engines[1].table_count, Some(1));
    }

    #[test]
    fn non_pdf_input_fails_before_any_engine() {
        let primary = FakeEngine::lattice(Ok(vec![holdings_grid()]));
        let secondary = FakeEngine::stream(Ok(Vec::new()));

        let err = extractor(&primary, &secondary)
            .extract_bytes(b"GIF89a", "image.pdf", RequestedMethod::Auto, false)
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractError::Failed {
                source: PdfError::NotAPdf(_),
                ..
            }
        ));
        assert_eq!(primary.calls(), 0);
        assert!(err.info().engines.is_empty());
        assert_eq!(err.into_info().filename, "image.pdf");
    }

    #[test]
    fn extract_from_path_reports_unreadable_file() {
        let primary = FakeEngine::lattice(Ok(vec![holdings_grid()]));
        let secondary = FakeEngine::stream(Ok(Vec::new()));
        let dir = tempfile::tempdir().unwrap();

        let err = extractor(&primary, &secondary)
            .extract(
                &dir.path().join("missing.pdf"),
                "missing.pdf",
                RequestedMethod::Auto,
                false,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractError::Failed {
                source: PdfError::Io(_),
                ..
            }
        ));
    }

    #[test]
    fn extract_from_path_runs_engines() {
        let primary = FakeEngine::lattice(Ok(vec![cash_grid().with_page(1)]));
        let secondary = FakeEngine::stream(Ok(Vec::new()));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PDF).unwrap();

        let result = extractor(&primary, &secondary)
            .extract(file.path(), "statement.pdf", RequestedMethod::Auto, false)
            .unwrap();

        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].page, 1);
    }

    #[test]
    fn missing_primary_page_uses_ordinal() {
        let table = table_from_grid(ExtractionMethod::PrimaryLattice, 4, cash_grid()).unwrap();
        assert_eq!(table.page, 5);
        assert_eq!(table.id, "lattice-table-4");
    }

    #[test]
    fn all_blank_grid_yields_no_table() {
        let grid = RawGrid::from_text_rows([["", "nan"], [" ", ""]]);
        assert!(table_from_grid(ExtractionMethod::SecondaryStream, 0, grid).is_none());
        assert!(table_from_grid(ExtractionMethod::SecondaryStream, 0, RawGrid::default()).is_none());
    }

    #[test]
    fn stream_grid_needs_a_data_row() {
        let header_only = RawGrid::from_text_rows([
            vec!["Date", "Description", "Amount"],
            vec!["", "nan", " "],
        ]);
        assert!(
            table_from_grid(ExtractionMethod::SecondaryStream, 0, header_only.clone()).is_none()
        );

        let lattice = table_from_grid(ExtractionMethod::PrimaryLattice, 0, header_only).unwrap();
        assert_eq!(lattice.row_count, 0);
    }
}
