//! Multipart PDF upload handling.
//!
//! Reads the `file` and optional `method` fields of a `multipart/form-data`
//! request into memory, enforcing the configured size limit while the body
//! streams in.

use actix_multipart::{Field, Multipart, MultipartError};
use futures::StreamExt as _;
use statement_tables_table_models::RequestedMethod;

/// Form field holding the PDF.
pub const FILE_FIELD: &str = "file";

/// Form field holding the requested extraction method.
pub const METHOD_FIELD: &str = "method";

/// Upper bound for non-file form fields.
const MAX_FIELD_BYTES: usize = 1024;

/// Reasons an upload is rejected before extraction starts.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// No `file` field was sent.
    #[error("No file provided")]
    MissingFile,

    /// The `file` field has no filename.
    #[error("Empty filename")]
    EmptyFilename,

    /// The filename does not end in `.pdf`.
    #[error("Only PDF files are supported")]
    NotPdf,

    /// A field exceeded its size limit.
    #[error("Upload exceeds the {limit} byte limit")]
    TooLarge {
        /// The limit that was hit.
        limit: usize,
    },

    /// The `method` field is not a known extraction method.
    #[error("Unsupported extraction method '{0}'")]
    UnknownMethod(String),

    /// The multipart body could not be parsed.
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

/// A validated upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-supplied filename.
    pub filename: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// Requested extraction method (`auto` when omitted or empty).
    pub method: RequestedMethod,
}

/// Reads and validates an upload.
///
/// Fields other than `file` and `method` are drained and ignored.
///
/// # Errors
///
/// Returns [`UploadError`] if the body is malformed, a field is too large,
/// the file is missing or not a `.pdf`, or the method is unknown.
#[allow(clippy::future_not_send)]
pub async fn read_upload(mut payload: Multipart, max_bytes: usize) -> Result<Upload, UploadError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut method: Option<String> = None;

    while let Some(field) = payload.next().await {
        let mut field = field?;
        let name = field.name().map(ToOwned::to_owned);

        match name.as_deref() {
            Some(FILE_FIELD) => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(ToOwned::to_owned)
                    .unwrap_or_default();
                let bytes = read_field(&mut field, max_bytes).await?;
                log::debug!("Received {} ({} bytes)", filename, bytes.len());
                file = Some((filename, bytes));
            }
            Some(METHOD_FIELD) => {
                let bytes = read_field(&mut field, MAX_FIELD_BYTES).await?;
                method = Some(String::from_utf8_lossy(&bytes).trim().to_owned());
            }
            other => {
                log::debug!("Ignoring form field {other:?}");
                read_field(&mut field, max_bytes).await?;
            }
        }
    }

    let (filename, bytes) = file.ok_or(UploadError::MissingFile)?;
    validate_filename(&filename)?;

    Ok(Upload {
        filename,
        bytes,
        method: parse_method(method.as_deref())?,
    })
}

/// Checks that a filename is present and ends in `.pdf` (any case).
///
/// # Errors
///
/// Returns [`UploadError::EmptyFilename`] or [`UploadError::NotPdf`].
pub fn validate_filename(filename: &str) -> Result<(), UploadError> {
    if filename.trim().is_empty() {
        return Err(UploadError::EmptyFilename);
    }
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(UploadError::NotPdf);
    }
    Ok(())
}

/// Parses the `method` field. Missing or empty means `auto`.
///
/// # Errors
///
/// Returns [`UploadError::UnknownMethod`] for anything else that does not
/// parse.
pub fn parse_method(raw: Option<&str>) -> Result<RequestedMethod, UploadError> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(RequestedMethod::default()),
        Some(m) => m
            .parse()
            .map_err(|_| UploadError::UnknownMethod(m.to_owned())),
    }
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, UploadError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if bytes.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge { limit });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
