//! Error taxonomy for ingestion runs
//!
//! Row-level errors (`UnresolvedEntity`, `MalformedQuantity`) are recovered by
//! the sheet walker: the row is skipped and the scan continues. Everything else
//! aborts the aggregator that raised it, never its siblings in a batch.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Sheet '{sheet}' not found (available: {})", .available.join(", "))]
    SheetNotFound { sheet: String, available: Vec<String> },

    #[error("Sheet '{sheet}' is missing required columns {missing:?}")]
    MissingColumns { sheet: String, missing: Vec<String> },

    #[error("Unresolved entity: state '{state}'{}", .district.as_ref().map(|d| format!(", district '{}'", d)).unwrap_or_default())]
    UnresolvedEntity {
        state: String,
        district: Option<String>,
    },

    #[error("Malformed quantity in column {column}: {value}")]
    MalformedQuantity { column: String, value: String },

    #[error("Document not found: {0}")]
    DocumentNotFound(PathBuf),

    #[error("Document {path} is malformed: {reason}")]
    DocumentMalformed { path: PathBuf, reason: String },

    #[error("No record with {selector} in {path}; document left unmodified")]
    NoMatchingRecord { path: PathBuf, selector: String },

    #[error("Entity code table unavailable at {0}")]
    EntityCodesUnavailable(PathBuf),

    #[error("Upload of {remote_path} failed: {source}")]
    UploadFailed {
        remote_path: String,
        #[source]
        source: storage::StorageError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Errors the walker recovers from by skipping one row
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            IngestError::UnresolvedEntity { .. } | IngestError::MalformedQuantity { .. }
        )
    }
}
