use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::{content_hash, BlobInfo, BlobStore, UploadReceipt};

/// Google Cloud Storage through the JSON API
#[derive(Debug, Clone)]
pub struct GcsStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    token: String,
    public_base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectItem {
    name: String,
    // The API encodes sizes as decimal strings
    #[serde(default)]
    size: Option<String>,
}

impl GcsStore {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let token = config
            .access_token
            .clone()
            .ok_or_else(|| StorageError::Config("GCS_ACCESS_TOKEN missing".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent("sg-dashboard-ingest/0.1")
            .build()?;

        Ok(Self {
            client,
            endpoint: config.gcs_endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            token,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, remote_path: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(remote_path)
        )
    }

    fn upload_url(&self, remote_path: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(remote_path)
        )
    }

    fn list_url(&self, prefix: &str, page_token: Option<&str>) -> String {
        let mut url = format!(
            "{}/storage/v1/b/{}/o?prefix={}",
            self.endpoint,
            self.bucket,
            urlencoding::encode(prefix)
        );
        if let Some(token) = page_token {
            url.push_str("&pageToken=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    pub fn public_url(&self, remote_path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, remote_path)
    }

    async fn fail(resp: reqwest::Response) -> StorageError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        StorageError::Status { status, body }
    }
}

/// Content type sent with uploads, picked from the file extension
fn content_type_for(remote_path: &str) -> &'static str {
    let ext = Path::new(remote_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl BlobStore for GcsStore {
    #[instrument(skip(self))]
    async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<UploadReceipt> {
        let bytes = fs::read(local_path).await?;
        let size = bytes.len() as u64;
        let checksum = content_hash(&bytes);

        debug!("Uploading {} bytes to gs://{}/{}", size, self.bucket, remote_path);

        let resp = self
            .client
            .post(self.upload_url(remote_path))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, content_type_for(remote_path))
            .body(bytes)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }

        info!("Uploaded gs://{}/{}", self.bucket, remote_path);

        Ok(UploadReceipt {
            remote_path: remote_path.to_string(),
            url: self.public_url(remote_path),
            size,
            checksum,
        })
    }

    #[instrument(skip(self))]
    async fn download(&self, remote_path: &str) -> Result<Option<Vec<u8>>> {
        let resp = self
            .client
            .get(format!("{}?alt=media", self.object_url(remote_path)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }

        let bytes = resp.bytes().await?.to_vec();
        debug!("Downloaded {} bytes from gs://{}/{}", bytes.len(), self.bucket, remote_path);
        Ok(Some(bytes))
    }

    #[instrument(skip(self))]
    async fn delete(&self, remote_path: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.object_url(remote_path))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(remote_path.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Self::fail(resp).await);
        }

        info!("Deleted gs://{}/{}", self.bucket, remote_path);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>> {
        let mut blobs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let resp = self
                .client
                .get(self.list_url(prefix, page_token.as_deref()))
                .bearer_auth(&self.token)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(Self::fail(resp).await);
            }

            let page: ObjectList = serde_json::from_slice(&resp.bytes().await?)?;
            for item in page.items {
                if item.name.ends_with('/') {
                    continue;
                }
                blobs.push(BlobInfo {
                    url: self.public_url(&item.name),
                    size: item.size.and_then(|s| s.parse().ok()).unwrap_or(0),
                    name: item.name,
                });
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        blobs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(blobs)
    }

    fn location(&self) -> String {
        format!("gs://{}", self.bucket)
    }
}
