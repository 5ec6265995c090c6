//! Upload dispatcher: deterministic remote paths over a [`BlobStore`]

use std::path::Path;
use std::sync::Arc;
use storage::{BlobStore, UploadReceipt};
use tracing::{error, info};

use crate::error::{IngestError, Result};

/// `<prefix>/<logical name>.<ext>` with the name trimmed, lowercased and
/// spaces turned into hyphens. The extension is not doubled.
pub fn remote_path(prefix: &str, logical_name: &str, ext: &str) -> String {
    let mut name = logical_name.trim().to_lowercase().replace(' ', "-");
    let ext = ext.trim_start_matches('.').to_lowercase();

    if !ext.is_empty() && !name.ends_with(&format!(".{}", ext)) {
        name.push('.');
        name.push_str(&ext);
    }

    join_remote(prefix, &name)
}

/// `<prefix>/<relative>` with `relative` kept exactly as given
pub fn join_remote(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let relative = relative.trim_start_matches('/');
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn BlobStore>,
    prefix: String,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Remote path `local_path` would be uploaded to under `logical_name`
    pub fn remote_path_for(&self, local_path: &Path, logical_name: &str) -> String {
        let ext = local_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        remote_path(&self.prefix, logical_name, &ext)
    }

    /// Upload once. Failures come back as `UploadFailed`; retrying is up to
    /// the caller and the local file is left as it was.
    pub async fn dispatch(&self, local_path: &Path, logical_name: &str) -> Result<UploadReceipt> {
        let remote = self.remote_path_for(local_path, logical_name);
        self.upload_to(local_path, remote).await
    }

    /// Upload to `<prefix>/<relative>` without normalizing, for paths that
    /// embed entity ids
    pub async fn dispatch_exact(&self, local_path: &Path, relative: &str) -> Result<UploadReceipt> {
        let remote = join_remote(&self.prefix, relative);
        self.upload_to(local_path, remote).await
    }

    pub(crate) async fn upload_to(&self, local_path: &Path, remote: String) -> Result<UploadReceipt> {
        match self.store.upload(local_path, &remote).await {
            Ok(receipt) => {
                info!(remote_path = %receipt.remote_path, url = %receipt.url, "Uploaded");
                Ok(receipt)
            }
            Err(source) => {
                error!(remote_path = %remote, error = %source, "Upload failed");
                Err(IngestError::UploadFailed {
                    remote_path: remote,
                    source,
                })
            }
        }
    }
}
