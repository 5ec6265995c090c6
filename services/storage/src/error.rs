//! Error types for blob storage backends

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid storage response: {0}")]
    Response(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
