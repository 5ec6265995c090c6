use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::{Result, StorageError};
use crate::{content_hash, BlobInfo, BlobStore, UploadReceipt};

/// A local directory used as a bucket. Remote paths map to files below
/// `root` with `/` as the separator.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, remote_path: &str) -> Result<PathBuf> {
        let relative = Path::new(remote_path.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::Config(format!(
                "invalid remote path '{}'",
                remote_path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn url_for(&self, path: &Path) -> String {
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        format!("file://{}", absolute.display())
    }
}

#[async_trait]
impl BlobStore for FsStore {
    #[instrument(skip(self))]
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<UploadReceipt> {
        let target = self.resolve(remote_path)?;
        let bytes = fs::read(local_path).await?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &bytes).await?;

        info!(remote_path, size = bytes.len(), "Stored blob in {}", self.root.display());

        Ok(UploadReceipt {
            remote_path: remote_path.to_string(),
            url: self.url_for(&target),
            size: bytes.len() as u64,
            checksum: content_hash(&bytes),
        })
    }

    #[instrument(skip(self))]
    async fn download(&self, remote_path: &str) -> Result<Option<Vec<u8>>> {
        let target = self.resolve(remote_path)?;
        match fs::read(&target).await {
            Ok(bytes) => {
                debug!(size = bytes.len(), "Read blob");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, remote_path: &str) -> Result<()> {
        let target = self.resolve(remote_path)?;
        match fs::remove_file(&target).await {
            Ok(()) => {
                info!(remote_path, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(remote_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>> {
        let mut blobs = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }

                let Ok(relative) = path.strip_prefix(&self.root) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");

                if name.starts_with(prefix) {
                    blobs.push(BlobInfo {
                        url: self.url_for(&path),
                        name,
                        size: metadata.len(),
                    });
                }
            }
        }

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }

    fn location(&self) -> String {
        format!("fs://{}", self.root.display())
    }
}
