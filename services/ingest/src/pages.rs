//! Whole-page documents: pull from the bucket into `pages/`, push back

use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use storage::UploadReceipt;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::dispatch::{remote_path, Dispatcher};
use crate::document::write_bytes_atomic;
use crate::error::{IngestError, Result};

pub const PAGE_NAMES: [&str; 9] = [
    "landing page",
    "Community country view",
    "Community details page",
    "District view indicators",
    "Community led improvements page",
    "dashboard",
    "Network health",
    "State details page",
    "Voices from the ground",
];

/// `"Voices from the ground"` -> `voices-from-the-ground.json`
pub fn page_file_name(name: &str) -> String {
    format!("{}.json", name.trim().to_lowercase().replace(' ', "-"))
}

/// Canonical page name for user input, matched case-insensitively
pub fn find_page(name: &str) -> Result<&'static str> {
    let wanted = name.trim().to_lowercase();
    PAGE_NAMES
        .iter()
        .find(|page| page.to_lowercase() == wanted || page_file_name(page) == wanted)
        .copied()
        .ok_or_else(|| {
            IngestError::InvalidInput(format!(
                "Unknown page '{}' (expected one of: {})",
                name,
                PAGE_NAMES.join(", ")
            ))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulledPage {
    pub name: String,
    pub path: PathBuf,
    pub source: PageSource,
    pub content: Value,
}

fn parse_page(bytes: &[u8], origin: &Path) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|e| IngestError::DocumentMalformed {
        path: origin.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Refresh the local copy from the bucket. Downloaded bytes must parse
/// before they replace the local file; a page missing remotely falls back to
/// the local copy.
pub async fn pull_page(
    dispatcher: &Dispatcher,
    config: &IngestConfig,
    name: &str,
) -> Result<PulledPage> {
    let local = config.page_path(&page_file_name(name));
    let remote = remote_path(dispatcher.prefix(), name, "json");

    match dispatcher.store().download(&remote).await? {
        Some(bytes) => {
            let content = parse_page(&bytes, Path::new(&remote))?;
            write_bytes_atomic(&local, &bytes)?;
            info!(remote_path = %remote, path = %local.display(), "Pulled page");
            Ok(PulledPage {
                name: name.to_string(),
                path: local,
                source: PageSource::Remote,
                content,
            })
        }
        None => {
            warn!(remote_path = %remote, "Page not in bucket, using local copy");
            let bytes = match std::fs::read(&local) {
                Ok(b) => b,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(IngestError::DocumentNotFound(local));
                }
                Err(e) => return Err(e.into()),
            };
            let content = parse_page(&bytes, &local)?;
            Ok(PulledPage {
                name: name.to_string(),
                path: local,
                source: PageSource::Local,
                content,
            })
        }
    }
}

/// Upload the local copy after checking it is still valid JSON
pub async fn push_page(
    dispatcher: &Dispatcher,
    config: &IngestConfig,
    name: &str,
) -> Result<UploadReceipt> {
    let local = config.page_path(&page_file_name(name));
    let bytes = match std::fs::read(&local) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::DocumentNotFound(local));
        }
        Err(e) => return Err(e.into()),
    };
    parse_page(&bytes, &local)?;

    dispatcher.dispatch(&local, name).await
}
