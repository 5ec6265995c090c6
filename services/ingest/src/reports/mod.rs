//! Report kinds and the sheet each one reads
//!
//! Every kind is bound to exactly one declared sheet. A handler turns that
//! sheet into local documents plus the uploads that publish them; the
//! transfer itself happens in [`crate::pipeline`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::walker::WalkSummary;
use crate::workbook::{normalize_name, Sheet};

pub mod big_numbers;
pub mod icons;
pub mod line_chart;

pub const QUARTERLY_SHEET: &str = "Micro improvements progress";
pub const BIG_NUMBERS_SHEET: &str = "Voices tab_Big numbers";
pub const ICONS_SHEET: &str = "Images/icons";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportKind {
    DashboardLineChart,
    StateLineCharts,
    DistrictLineCharts,
    VoicesLineChart,
    VoicesBigNumbers,
    Icons,
}

/// A file to publish once the handler is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedUpload {
    pub local_path: PathBuf,
    pub logical_name: String,
    /// Fetch the file from here before uploading
    pub fetch_from: Option<String>,
    /// Delete the local file after a successful upload
    pub remove_after: bool,
    /// `logical_name` is already the remote path below the prefix and must
    /// not be normalized
    pub exact_path: bool,
}

impl PlannedUpload {
    pub fn document(local_path: PathBuf, logical_name: impl Into<String>) -> Self {
        Self {
            local_path,
            logical_name: logical_name.into(),
            fetch_from: None,
            remove_after: false,
            exact_path: false,
        }
    }

    /// Per-entity file published under its data-dir relative path, ids intact
    pub fn entity_file(local_path: PathBuf, relative: impl Into<String>) -> Self {
        Self {
            exact_path: true,
            ..Self::document(local_path, relative)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOutput {
    pub walk: Option<WalkSummary>,
    pub written: Vec<PathBuf>,
    pub uploads: Vec<PlannedUpload>,
    pub notes: Vec<String>,
}

pub type Handler = fn(&Sheet, &IngestConfig) -> Result<ReportOutput>;

struct ReportEntry {
    kind: ReportKind,
    name: &'static str,
    sheet: &'static str,
    handler: Handler,
}

static REPORTS: [ReportEntry; 6] = [
    ReportEntry {
        kind: ReportKind::DashboardLineChart,
        name: "dashboard-line-chart",
        sheet: QUARTERLY_SHEET,
        handler: line_chart::dashboard,
    },
    ReportEntry {
        kind: ReportKind::StateLineCharts,
        name: "state-line-charts",
        sheet: QUARTERLY_SHEET,
        handler: line_chart::states,
    },
    ReportEntry {
        kind: ReportKind::DistrictLineCharts,
        name: "district-line-charts",
        sheet: QUARTERLY_SHEET,
        handler: line_chart::districts,
    },
    ReportEntry {
        kind: ReportKind::VoicesLineChart,
        name: "voices-line-chart",
        sheet: QUARTERLY_SHEET,
        handler: line_chart::voices,
    },
    ReportEntry {
        kind: ReportKind::VoicesBigNumbers,
        name: "voices-big-numbers",
        sheet: BIG_NUMBERS_SHEET,
        handler: big_numbers::voices_big_numbers,
    },
    ReportEntry {
        kind: ReportKind::Icons,
        name: "icons",
        sheet: ICONS_SHEET,
        handler: icons::icons,
    },
];

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::DashboardLineChart,
        ReportKind::StateLineCharts,
        ReportKind::DistrictLineCharts,
        ReportKind::VoicesLineChart,
        ReportKind::VoicesBigNumbers,
        ReportKind::Icons,
    ];

    fn entry(self) -> &'static ReportEntry {
        // REPORTS is laid out in ALL order
        &REPORTS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn sheet(self) -> &'static str {
        self.entry().sheet
    }

    pub fn handler(self) -> Handler {
        self.entry().handler
    }

    /// Kinds bound to `sheet` (matched by normalized name), in table order
    pub fn for_sheet(sheet: &str) -> Vec<ReportKind> {
        let wanted = normalize_name(sheet);
        REPORTS
            .iter()
            .filter(|entry| normalize_name(entry.sheet) == wanted)
            .map(|entry| entry.kind)
            .collect()
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_name(s);
        REPORTS
            .iter()
            .find(|entry| normalize_name(entry.name) == wanted)
            .map(|entry| entry.kind)
            .ok_or_else(|| {
                let known: Vec<&str> = REPORTS.iter().map(|e| e.name).collect();
                IngestError::InvalidInput(format!(
                    "Unknown report '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// Workbook sheets that feed at least one report, with the kinds they feed
pub fn recognized_sheets(sheet_names: &[String]) -> Vec<(String, Vec<ReportKind>)> {
    sheet_names
        .iter()
        .filter_map(|name| {
            let kinds = ReportKind::for_sheet(name);
            if kinds.is_empty() {
                None
            } else {
                Some((name.clone(), kinds))
            }
        })
        .collect()
}
