//! Dashboard icons: name cleaning, sharing-link ids, single-icon upload/undo
//!
//! Icons live under `<prefix>/assets/icons/<clean name>.svg`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use storage::BlobStore;
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::error::{IngestError, Result};

pub const ICON_DIR: &str = "assets/icons";

pub const DRIVE_DOWNLOAD_URL: &str = "https://drive.google.com/uc?export=download&id=";

static DRIVE_ID_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("valid drive path pattern"),
        Regex::new(r"id=([a-zA-Z0-9_-]+)").expect("valid drive query pattern"),
    ]
});

/// Lowercase, spaces to `_`, then keep only `[a-z0-9_-]`
pub fn clean_name(name: &str) -> String {
    name.to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// File id from a `.../d/<id>/...` or `...?id=<id>` sharing link
pub fn drive_file_id(link: &str) -> Option<String> {
    DRIVE_ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(link)?
            .get(1)
            .map(|m| m.as_str().to_string())
    })
}

pub fn drive_download_url(file_id: &str) -> String {
    format!("{}{}", DRIVE_DOWNLOAD_URL, file_id)
}

/// Logical name of an icon blob, before the prefix is applied
pub fn icon_logical_name(clean: &str) -> String {
    format!("{}/{}.svg", ICON_DIR, clean)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconUpload {
    pub url: String,
    pub blob_path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Upload one SVG from disk under a cleaned `image_name`
pub async fn upload_icon(
    dispatcher: &Dispatcher,
    local_path: &Path,
    image_name: &str,
) -> Result<IconUpload> {
    if !local_path.is_file() {
        return Err(IngestError::InvalidInput(format!(
            "File not found: {}",
            local_path.display()
        )));
    }

    let is_svg = local_path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);
    if !is_svg {
        return Err(IngestError::InvalidInput(
            "Only SVG images are allowed".to_string(),
        ));
    }

    let clean = clean_name(image_name);
    if image_name.trim().is_empty() || clean.is_empty() {
        return Err(IngestError::InvalidInput("Image name is required".to_string()));
    }

    let receipt = dispatcher
        .dispatch(local_path, &icon_logical_name(&clean))
        .await?;

    Ok(IconUpload {
        url: receipt.url,
        blob_path: receipt.remote_path,
        uploaded_at: Utc::now(),
    })
}

/// Remove a previously uploaded icon
pub async fn undo_icon(store: &dyn BlobStore, blob_path: &str) -> Result<()> {
    store.delete(blob_path).await?;
    info!(blob_path, "Removed icon");
    Ok(())
}

/// Fetch an image into `save_path`; returns the byte count
pub async fn download_image(client: &reqwest::Client, url: &str, save_path: &Path) -> Result<u64> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| IngestError::Download(format!("{}: {}", url, e)))?;

    let bytes = response
        .bytes()
        .await
        .map_err(|e| IngestError::Download(format!("{}: {}", url, e)))?;

    if bytes.is_empty() {
        warn!(url, "Downloaded image is empty");
    }

    if let Some(parent) = save_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(save_path, &bytes).await?;
    Ok(bytes.len() as u64)
}
