use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where local documents live and which years a run aggregates.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub data_dir: PathBuf,
    pub years: Vec<i32>,
    pub voices_year: i32,
    pub remote_prefix: String,
    pub upload_enabled: bool,
    pub download_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            years: vec![2024, 2025],
            voices_year: 2025,
            remote_prefix: "sg-dashboard".to_string(),
            upload_enabled: true,
            download_timeout_secs: 30,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            years: match std::env::var("REPORT_YEARS") {
                Ok(v) => parse_years(&v).context("REPORT_YEARS must be a comma-separated list of years")?,
                Err(_) => defaults.years,
            },
            voices_year: match std::env::var("VOICES_YEAR") {
                Ok(v) => v.trim().parse().context("VOICES_YEAR must be a year")?,
                Err(_) => defaults.voices_year,
            },
            remote_prefix: std::env::var("REMOTE_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or(defaults.remote_prefix),
            upload_enabled: std::env::var("UPLOAD_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.upload_enabled),
            download_timeout_secs: std::env::var("DOWNLOAD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.download_timeout_secs),
        })
    }

    /// Local directory for a config rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.data_dir.join("pages")
    }

    pub fn page_path(&self, file_name: &str) -> PathBuf {
        self.pages_dir().join(file_name)
    }

    pub fn dashboard_path(&self) -> PathBuf {
        self.page_path("dashboard.json")
    }

    pub fn voices_path(&self) -> PathBuf {
        self.page_path("voices-from-the-ground.json")
    }

    pub fn entity_codes_path(&self) -> PathBuf {
        self.page_path("state_code_details.json")
    }

    pub fn states_dir(&self) -> PathBuf {
        self.data_dir.join("states")
    }

    pub fn districts_dir(&self) -> PathBuf {
        self.data_dir.join("districts")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("temp_downloads")
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Path of `path` relative to `data_dir`, with `/` separators
    pub fn relative_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.data_dir).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn parse_years(raw: &str) -> Result<Vec<i32>> {
    let mut years = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let year: i32 = part
            .parse()
            .with_context(|| format!("Invalid year '{}'", part))?;
        if !years.contains(&year) {
            years.push(year);
        }
    }
    if years.is_empty() {
        anyhow::bail!("No years given");
    }
    years.sort_unstable();
    Ok(years)
}
