use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StorageError};

/// Which backend a [`StorageConfig`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A local directory standing in for the bucket
    Fs,
    /// Google Cloud Storage JSON API
    Gcs,
}

impl std::str::FromStr for Backend {
    type Err = StorageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fs" | "local" => Ok(Backend::Fs),
            "gcs" | "gcp" => Ok(Backend::Gcs),
            other => Err(StorageError::Config(format!("unknown storage backend '{}'", other))),
        }
    }
}

/// Storage settings. Built once by the binary and handed to the backend
/// constructor; nothing below this reads the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: Backend,
    pub bucket: String,
    pub fs_root: PathBuf,
    pub gcs_endpoint: String,
    pub access_token: Option<String>,
    pub public_base_url: String,
    pub timeout_secs: u64,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => Backend::Fs,
        };

        let config = Self {
            backend,
            bucket: env::var("BUCKET_NAME").unwrap_or_else(|_| "sg-dashboard-local".to_string()),
            fs_root: PathBuf::from(
                env::var("STORAGE_FS_ROOT").unwrap_or_else(|_| "./data/bucket".to_string()),
            ),
            gcs_endpoint: env::var("GCS_ENDPOINT")
                .unwrap_or_else(|_| "https://storage.googleapis.com".to_string()),
            access_token: env::var("GCS_ACCESS_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            public_base_url: env::var("GCS_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "https://storage.googleapis.com".to_string()),
            timeout_secs: env::var("STORAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn for_local_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: Backend::Fs,
            bucket: "local".to_string(),
            fs_root: root.into(),
            gcs_endpoint: "https://storage.googleapis.com".to_string(),
            access_token: None,
            public_base_url: "https://storage.googleapis.com".to_string(),
            timeout_secs: 120,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == Backend::Gcs {
            if self.bucket.trim().is_empty() {
                return Err(StorageError::Config("BUCKET_NAME is required for gcs".to_string()));
            }
            if self.access_token.is_none() {
                return Err(StorageError::Config(
                    "GCS_ACCESS_TOKEN is required for gcs".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
