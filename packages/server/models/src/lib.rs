#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API response types for the statement tables server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the pipeline types so the wire format can stay stable for existing
//! front-ends: table fields are `snake_case`, while the classification
//! fields keep their original `dataType`/`suggestedImport` names.

use serde::{Deserialize, Serialize};
use statement_tables_table_models::{
    ExtractionInfo, ExtractionMethod, RawTable, Row, TableLabel,
};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "PDF Table Extraction";

/// A table as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTable {
    /// Table ID (e.g. `lattice-table-0`).
    pub id: String,
    /// 1-based page number.
    pub page: u32,
    /// Engine that produced the table.
    pub method: ExtractionMethod,
    /// Engine confidence in `0.0..=1.0`, or `null`.
    pub accuracy: Option<f64>,
    /// Header row.
    pub headers: Row,
    /// Data rows.
    pub rows: Vec<Row>,
    /// Number of data rows.
    pub row_count: usize,
    /// Number of columns.
    pub column_count: usize,
    /// Classification label (classification endpoint only).
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<TableLabel>,
    /// Suggested import target; currently always the classification label.
    #[serde(
        rename = "suggestedImport",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub suggested_import: Option<TableLabel>,
}

impl From<RawTable> for ApiTable {
    fn from(table: RawTable) -> Self {
        Self {
            id: table.id,
            page: table.page,
            method: table.method,
            accuracy: table.confidence,
            headers: table.headers,
            rows: table.rows,
            row_count: table.row_count,
            column_count: table.column_count,
            data_type: table.classification,
            suggested_import: table.classification,
        }
    }
}

/// Body of a successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiExtractSuccess {
    /// Always `true`.
    pub success: bool,
    /// Extracted tables.
    pub tables: Vec<ApiTable>,
    /// What was attempted.
    pub extraction_info: ExtractionInfo,
    /// `tables.len()`.
    pub total_tables: usize,
}

impl ApiExtractSuccess {
    /// Builds a success body from pipeline tables.
    #[must_use]
    pub fn new(tables: Vec<RawTable>, extraction_info: ExtractionInfo) -> Self {
        let tables: Vec<ApiTable> = tables.into_iter().map(ApiTable::from).collect();
        Self {
            success: true,
            total_tables: tables.len(),
            tables,
            extraction_info,
        }
    }
}

/// Body of a failed extraction ("no tables found" or an unexpected error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiExtractFailure {
    /// Always `false`.
    pub success: bool,
    /// Human-readable reason.
    pub error: String,
    /// What was attempted before the failure.
    pub extraction_info: ExtractionInfo,
}

impl ApiExtractFailure {
    /// Builds a failure body.
    #[must_use]
    pub fn new(error: impl Into<String>, extraction_info: ExtractionInfo) -> Self {
        Self {
            success: false,
            error: error.into(),
            extraction_info,
        }
    }
}

/// Body of a rejected request (bad upload, unknown method).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable reason.
    pub error: String,
}

impl ApiError {
    /// Builds an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHealth {
    /// `"healthy"` while the service is up.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}
