//! Storage - Blob storage collaborator for dashboard documents and assets
//!
//! Responsibilities:
//! - Upload local files to a bucket and hand back a public locator
//! - Download blobs (absent blobs are `None`, not errors)
//! - Delete blobs and list them by prefix
//!
//! Backends:
//! - `fs`: a local directory acting as the bucket (development, tests)
//! - `gcs`: Google Cloud Storage JSON API over HTTPS
//!
//! Transport and credentials stay in here. Callers only see [`BlobStore`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod fs;
pub mod gcs;

pub use config::{Backend, StorageConfig};
pub use error::{Result, StorageError};
pub use fs::FsStore;
pub use gcs::GcsStore;

/// What a successful upload returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub remote_path: String,
    pub url: String,
    pub size: u64,
    pub checksum: String,
}

/// One entry of a [`BlobStore::list`] result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub name: String,
    pub size: u64,
    pub url: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Copy `local_path` to `remote_path`, replacing any existing blob
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<UploadReceipt>;

    /// Fetch a blob; `Ok(None)` when it does not exist
    async fn download(&self, remote_path: &str) -> Result<Option<Vec<u8>>>;

    async fn delete(&self, remote_path: &str) -> Result<()>;

    /// Blobs under `prefix`, sorted by name, without directory placeholders
    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>>;

    /// Human-readable backend location, e.g. `gs://bucket`
    fn location(&self) -> String;
}

/// Build the backend selected by `config`
pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    config.validate()?;
    match config.backend {
        Backend::Fs => Ok(Arc::new(FsStore::new(&config.fs_root))),
        Backend::Gcs => Ok(Arc::new(GcsStore::new(config)?)),
    }
}

/// Content hash in the `sha256:<hex>` form used in receipts
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}
