//! Batch runs over a workbook
//!
//! Each report kind runs on its own: a sheet or document failure marks that
//! kind failed and the batch moves on. Upload failures never fail a kind,
//! since the local documents are already written.

use std::path::PathBuf;
use std::time::Duration;
use storage::UploadReceipt;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::dispatch::Dispatcher;
use crate::error::{IngestError, Result};
use crate::icons::download_image;
use crate::reports::{PlannedUpload, ReportKind};
use crate::walker::WalkSummary;
use crate::workbook::Workbook;

/// What one successful kind did
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub kind: ReportKind,
    pub sheet: String,
    pub walk: Option<WalkSummary>,
    pub written: Vec<PathBuf>,
    pub uploaded: Vec<UploadReceipt>,
    pub upload_failures: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Ok(RunSummary),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<(ReportKind, ReportOutcome)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, ReportOutcome::Ok(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_ok(&self) -> bool {
        self.failed() == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.all_ok() {
            0
        } else {
            1
        }
    }

    pub fn outcome(&self, kind: ReportKind) -> Option<&ReportOutcome> {
        self.outcomes.iter().find(|(k, _)| *k == kind).map(|(_, o)| o)
    }

    /// One status line per kind, details indented below it
    pub fn status_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (kind, outcome) in &self.outcomes {
            match outcome {
                ReportOutcome::Ok(summary) => {
                    let mut line = format!("✓ {} ({} file(s) written", kind, summary.written.len());
                    if !summary.uploaded.is_empty() {
                        line.push_str(&format!(", {} uploaded", summary.uploaded.len()));
                    }
                    line.push(')');
                    lines.push(line);

                    if let Some(walk) = &summary.walk {
                        if walk.skipped() > 0 {
                            lines.push(format!("    {} row(s) skipped", walk.skipped()));
                        }
                    }
                    for note in &summary.notes {
                        lines.push(format!("    ⚠ {}", note));
                    }
                    for failure in &summary.upload_failures {
                        lines.push(format!("    ✗ {}", failure));
                    }
                }
                ReportOutcome::Failed(message) => {
                    lines.push(format!("✗ {}: {}", kind, message));
                }
            }
        }
        lines
    }
}

pub struct Pipeline {
    config: IngestConfig,
    dispatcher: Option<Dispatcher>,
    client: reqwest::Client,
}

impl Pipeline {
    /// `dispatcher` is `None` when uploads are switched off
    pub fn new(config: IngestConfig, dispatcher: Option<Dispatcher>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.download_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IngestError::Download(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            dispatcher,
            client,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Run one kind start to finish: read its sheet, write documents, upload
    pub async fn run_kind(&self, workbook: &mut Workbook, kind: ReportKind) -> Result<RunSummary> {
        let sheet = workbook.sheet(kind.sheet())?;
        info!(report = %kind, sheet = sheet.name(), "Running report");

        let output = (kind.handler())(&sheet, &self.config)?;
        let (uploaded, upload_failures) = self.transfer(&output.uploads).await;

        Ok(RunSummary {
            kind,
            sheet: sheet.name().to_string(),
            walk: output.walk,
            written: output.written,
            uploaded,
            upload_failures,
            notes: output.notes,
        })
    }

    /// Run `kinds` in order, each isolated from the others' failures
    pub async fn run_kinds(&self, workbook: &mut Workbook, kinds: &[ReportKind]) -> BatchReport {
        let mut report = BatchReport::default();
        for &kind in kinds {
            let outcome = match self.run_kind(workbook, kind).await {
                Ok(summary) => ReportOutcome::Ok(summary),
                Err(e) => {
                    error!(report = %kind, error = %e, "Report failed");
                    ReportOutcome::Failed(e.to_string())
                }
            };
            report.outcomes.push((kind, outcome));
        }
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch finished"
        );
        report
    }

    /// Every kind bound to `sheet`
    pub async fn run_sheet(&self, workbook: &mut Workbook, sheet: &str) -> Result<BatchReport> {
        let kinds = ReportKind::for_sheet(sheet);
        if kinds.is_empty() {
            return Err(IngestError::InvalidInput(format!(
                "No report reads sheet '{}'",
                sheet
            )));
        }
        Ok(self.run_kinds(workbook, &kinds).await)
    }

    pub async fn run_all(&self, workbook: &mut Workbook) -> BatchReport {
        self.run_kinds(workbook, &ReportKind::ALL).await
    }

    async fn transfer(&self, uploads: &[PlannedUpload]) -> (Vec<UploadReceipt>, Vec<String>) {
        let mut receipts = Vec::new();
        let mut failures = Vec::new();

        let Some(dispatcher) = &self.dispatcher else {
            if !uploads.is_empty() {
                info!(count = uploads.len(), "Uploads disabled, skipping transfer");
            }
            return (receipts, failures);
        };

        for upload in uploads {
            match self.transfer_one(dispatcher, upload).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => failures.push(format!("{}: {}", upload.logical_name, e)),
            }
        }

        (receipts, failures)
    }

    async fn transfer_one(
        &self,
        dispatcher: &Dispatcher,
        upload: &PlannedUpload,
    ) -> Result<UploadReceipt> {
        if let Some(url) = &upload.fetch_from {
            let size = download_image(&self.client, url, &upload.local_path).await?;
            info!(url = %url, size, "Downloaded");
        }

        let receipt = if upload.exact_path {
            dispatcher
                .dispatch_exact(&upload.local_path, &upload.logical_name)
                .await?
        } else {
            dispatcher
                .dispatch(&upload.local_path, &upload.logical_name)
                .await?
        };

        if upload.remove_after {
            if let Err(e) = tokio::fs::remove_file(&upload.local_path).await {
                warn!(path = %upload.local_path.display(), error = %e, "Could not remove scratch file");
            }
        }

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(kind: ReportKind) -> RunSummary {
        RunSummary {
            kind,
            sheet: "Micro improvements progress".to_string(),
            walk: Some(WalkSummary {
                rows_seen: 3,
                accepted: 2,
                unresolved: 1,
                ..WalkSummary::default()
            }),
            written: vec![PathBuf::from("pages/dashboard.json")],
            uploaded: Vec::new(),
            upload_failures: vec!["dashboard: Upload failed".to_string()],
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_exit_code_reflects_failures() {
        let mut report = BatchReport::default();
        report.outcomes.push((
            ReportKind::DashboardLineChart,
            ReportOutcome::Ok(summary(ReportKind::DashboardLineChart)),
        ));
        assert!(report.all_ok());
        assert_eq!(report.exit_code(), 0);

        report.outcomes.push((
            ReportKind::Icons,
            ReportOutcome::Failed("Sheet 'Images/icons' not found".to_string()),
        ));
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_status_lines() {
        let report = BatchReport {
            outcomes: vec![
                (
                    ReportKind::DashboardLineChart,
                    ReportOutcome::Ok(summary(ReportKind::DashboardLineChart)),
                ),
                (ReportKind::Icons, ReportOutcome::Failed("boom".to_string())),
            ],
        };
        assert_eq!(
            report.status_lines(),
            vec![
                "✓ dashboard-line-chart (1 file(s) written)".to_string(),
                "    1 row(s) skipped".to_string(),
                "    ✗ dashboard: Upload failed".to_string(),
                "✗ icons: boom".to_string(),
            ]
        );
    }
}
