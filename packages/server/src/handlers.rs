//! HTTP handler functions for the statement tables API.

use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use statement_tables_extract::ExtractError;
use statement_tables_server_models::{
    ApiError, ApiExtractFailure, ApiExtractSuccess, ApiHealth, SERVICE_NAME,
};
use statement_tables_table_models::ExtractionInfo;

use crate::AppState;
use crate::upload::{self, Upload};

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /extract-tables`
///
/// Extracts tables from an uploaded PDF using the engine fallback policy.
#[allow(clippy::future_not_send)]
pub async fn extract_tables(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    run_extraction(&state, payload, false).await
}

/// `POST /extract-with-classification`
///
/// Same as [`extract_tables`], and labels each table with `dataType` and
/// `suggestedImport`.
#[allow(clippy::future_not_send)]
pub async fn extract_with_classification(
    state: web::Data<AppState>,
    payload: Multipart,
) -> HttpResponse {
    run_extraction(&state, payload, true).await
}

#[allow(clippy::future_not_send)]
async fn run_extraction(state: &AppState, payload: Multipart, classify: bool) -> HttpResponse {
    let Upload {
        filename,
        bytes,
        method,
    } = match upload::read_upload(payload, state.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(e) => {
            log::warn!("Rejected upload: {e}");
            return HttpResponse::BadRequest().json(ApiError::new(e.to_string()));
        }
    };

    log::info!(
        "Extracting tables from {filename} ({} bytes, method={method}, classify={classify})",
        bytes.len()
    );

    // Started here so every outcome reports when the request arrived.
    let info = ExtractionInfo::new(&filename, method);

    // Engines block on subprocesses, so the pipeline runs off the async workers.
    let extractor = Arc::clone(&state.extractor);
    let task_info = info.clone();
    let result = web::block(move || {
        extractor.extract_bytes_with_info(&bytes, task_info, classify)
    })
    .await;

    match result {
        Ok(Ok(extraction)) => {
            log::info!(
                "Extracted {} tables from {filename}",
                extraction.tables.len()
            );
            HttpResponse::Ok().json(ApiExtractSuccess::new(extraction.tables, extraction.info))
        }
        Ok(Err(e @ ExtractError::NoTablesFound(_))) => {
            let message = e.to_string();
            HttpResponse::NotFound().json(ApiExtractFailure::new(message, e.into_info()))
        }
        Ok(Err(e @ ExtractError::Failed { .. })) => {
            log::error!("Extraction of {filename} failed: {e}");
            let message = e.to_string();
            HttpResponse::InternalServerError()
                .json(ApiExtractFailure::new(message, e.into_info()))
        }
        Err(e) => {
            log::error!("Extraction task for {filename} did not complete: {e}");
            HttpResponse::InternalServerError().json(ApiExtractFailure::new(e.to_string(), info))
        }
    }
}
