//! Full runs against a generated workbook and a local-directory bucket

use ingest::dispatch::Dispatcher;
use ingest::pipeline::{BatchReport, Pipeline, ReportOutcome};
use ingest::workbook::Workbook;
use ingest::{IngestConfig, ReportKind};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::FsStore;
use tempfile::TempDir;

type Row<'a> = (&'a str, &'a str, f64, [Option<f64>; 4]);

struct Fixture {
    data: TempDir,
    bucket: TempDir,
    config: IngestConfig,
}

impl Fixture {
    fn new() -> Self {
        let data = tempfile::tempdir().unwrap();
        let bucket = tempfile::tempdir().unwrap();
        let config = IngestConfig::with_data_dir(data.path());

        std::fs::create_dir_all(config.pages_dir()).unwrap();
        write_json(
            &config.dashboard_path(),
            &json!([
                {"type": "hero", "title": "Shiksha"},
                {"type": "line-chart", "title": "Micro improvements", "data": []}
            ]),
        );
        write_json(
            &config.voices_path(),
            &json!([
                {"type": "micro-improvements-so-far", "data": []},
                {"type": "data-indicators", "indicators": [
                    {"label": "Shiksha Chaupals", "value": 0},
                    {"label": "Community members", "value": 0}
                ]}
            ]),
        );
        write_json(
            &config.entity_codes_path(),
            &json!({"MH": {"id": 27, "Pune": 521}, "KA": {"id": 29, "Mysuru": 577}}),
        );

        Self {
            data,
            bucket,
            config,
        }
    }

    fn pipeline(&self, upload: bool) -> Pipeline {
        let dispatcher = upload.then(|| {
            Dispatcher::new(Arc::new(FsStore::new(self.bucket.path())), "sg-dashboard")
        });
        Pipeline::new(self.config.clone(), dispatcher).unwrap()
    }

    fn remote(&self, path: &str) -> PathBuf {
        self.bucket.path().join("sg-dashboard").join(path)
    }
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn scenario_rows() -> Vec<Row<'static>> {
    vec![
        ("MH", "", 2025.0, [Some(10.0), Some(20.0), None, None]),
        ("MH", "Pune", 2025.0, [Some(5.0), None, None, None]),
    ]
}

/// Workbook with the quarterly and big-numbers sheets, no icons sheet
fn write_workbook(dir: &Path, rows: &[Row]) -> PathBuf {
    let path = dir.join("progress.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Micro improvements progress").unwrap();
    for (col, header) in ["State", "District", "Year", "Q1", "Q2", "Q3", "Q4"].iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, (state, district, year, quarters)) in rows.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, *state).unwrap();
        if !district.is_empty() {
            sheet.write_string(row, 1, *district).unwrap();
        }
        sheet.write_number(row, 2, *year).unwrap();
        for (q, value) in quarters.iter().enumerate() {
            if let Some(v) = value {
                sheet.write_number(row, 3 + q as u16, *v).unwrap();
            }
        }
    }

    let sheet = workbook.add_worksheet();
    sheet.set_name("Voices tab_Big numbers").unwrap();
    let headers = [
        "Name of the State ",
        "Name of the District",
        "Shiksha Chaupals",
        "Community members participating in dialogues",
        "Local challenges identified",
        "Community leaders driving improvements",
        "Local solutions identified",
        "Local Solutions implemented",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (row, values) in [[12.0, 40.0, 3.0, 2.0, 1.0, 1.0], [8.5, 10.0, 1.0, 0.0, 2.0, 1.0]]
        .iter()
        .enumerate()
    {
        let row = (row + 1) as u32;
        sheet.write_string(row, 0, "MH").unwrap();
        sheet.write_string(row, 1, "Pune").unwrap();
        for (col, value) in values.iter().enumerate() {
            sheet.write_number(row, 2 + col as u16, *value).unwrap();
        }
    }

    workbook.save(&path).unwrap();
    path
}

fn summary(report: &BatchReport, kind: ReportKind) -> &ingest::RunSummary {
    match report.outcome(kind) {
        Some(ReportOutcome::Ok(summary)) => summary,
        other => panic!("{} did not succeed: {:?}", kind, other),
    }
}

#[tokio::test]
async fn test_run_all_end_to_end() {
    let fx = Fixture::new();
    let xlsx = write_workbook(fx.data.path(), &scenario_rows());
    let mut workbook = Workbook::open(&xlsx).unwrap();

    let report = fx.pipeline(true).run_all(&mut workbook).await;

    // No icons sheet: only that kind fails
    assert_eq!(report.succeeded(), 5);
    assert!(matches!(
        report.outcome(ReportKind::Icons),
        Some(ReportOutcome::Failed(message)) if message.contains("not found")
    ));
    assert_eq!(report.exit_code(), 1);

    assert_eq!(
        read_json(&fx.config.states_dir().join("27/line-chart.json")),
        json!({"data": [{"year": 2025, "data": [10.0, 20.0]}]})
    );
    assert_eq!(
        read_json(&fx.config.districts_dir().join("521/line-chart.json")),
        json!({"data": [{"year": 2025, "data": [5.0]}]})
    );

    let dashboard = read_json(&fx.config.dashboard_path());
    assert_eq!(dashboard[0], json!({"type": "hero", "title": "Shiksha"}));
    assert_eq!(dashboard[1]["data"], json!([{"year": 2025, "data": [10.0, 20.0]}]));

    let voices = read_json(&fx.config.voices_path());
    assert_eq!(voices[0]["data"], json!([{"year": 2025, "data": [10.0, 20.0]}]));
    assert_eq!(voices[1]["indicators"][0]["value"], json!(20));
    assert_eq!(voices[1]["indicators"][1]["value"], json!(50));

    assert!(fx.remote("dashboard.json").exists());
    assert!(fx.remote("voices-from-the-ground.json").exists());
    assert!(fx.remote("states/27/line-chart.json").exists());
    assert!(fx.remote("districts/521/line-chart.json").exists());

    let states = summary(&report, ReportKind::StateLineCharts);
    assert_eq!(states.uploaded.len(), 1);
    assert!(states.upload_failures.is_empty());
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let fx = Fixture::new();
    let xlsx = write_workbook(fx.data.path(), &scenario_rows());
    let pipeline = fx.pipeline(false);

    let mut workbook = Workbook::open(&xlsx).unwrap();
    let first = pipeline.run_all(&mut workbook).await;

    let written: Vec<PathBuf> = ReportKind::ALL
        .iter()
        .filter_map(|&k| match first.outcome(k) {
            Some(ReportOutcome::Ok(s)) => Some(s.written.clone()),
            _ => None,
        })
        .flatten()
        .collect();
    assert!(!written.is_empty());
    let before: Vec<Vec<u8>> = written.iter().map(|p| std::fs::read(p).unwrap()).collect();

    let mut workbook = Workbook::open(&xlsx).unwrap();
    pipeline.run_all(&mut workbook).await;
    let after: Vec<Vec<u8>> = written.iter().map(|p| std::fs::read(p).unwrap()).collect();

    assert_eq!(before, after);
}

#[tokio::test]
async fn test_unresolved_row_does_not_block_later_rows() {
    let fx = Fixture::new();
    let xlsx = write_workbook(
        fx.data.path(),
        &[
            ("Atlantis", "", 2025.0, [Some(99.0), None, None, None]),
            ("KA", "", 2024.0, [Some(4.0), None, Some(6.0), None]),
        ],
    );
    let mut workbook = Workbook::open(&xlsx).unwrap();

    let report = fx
        .pipeline(false)
        .run_kinds(&mut workbook, &[ReportKind::StateLineCharts])
        .await;

    let states = summary(&report, ReportKind::StateLineCharts);
    let walk = states.walk.clone().unwrap();
    assert_eq!(walk.unresolved, 1);
    assert_eq!(walk.accepted, 1);
    assert_eq!(
        read_json(&fx.config.states_dir().join("29/line-chart.json")),
        json!({"data": [{"year": 2024, "data": [4.0, 6.0]}]})
    );
}

#[tokio::test]
async fn test_missing_document_fails_only_its_report() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.config.dashboard_path()).unwrap();
    let xlsx = write_workbook(fx.data.path(), &scenario_rows());
    let mut workbook = Workbook::open(&xlsx).unwrap();

    let report = fx
        .pipeline(false)
        .run_sheet(&mut workbook, "Micro improvements progress")
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert!(matches!(
        report.outcome(ReportKind::DashboardLineChart),
        Some(ReportOutcome::Failed(_))
    ));
    assert_eq!(report.succeeded(), 3);
    assert!(!fx.config.dashboard_path().exists());
}

#[tokio::test]
async fn test_without_upload_bucket_stays_empty() {
    let fx = Fixture::new();
    let xlsx = write_workbook(fx.data.path(), &scenario_rows());
    let mut workbook = Workbook::open(&xlsx).unwrap();

    let report = fx
        .pipeline(false)
        .run_kinds(&mut workbook, &[ReportKind::DashboardLineChart])
        .await;

    assert!(report.all_ok());
    assert!(summary(&report, ReportKind::DashboardLineChart).uploaded.is_empty());
    assert!(!fx.remote("dashboard.json").exists());
}

#[tokio::test]
async fn test_unknown_sheet_is_rejected() {
    let fx = Fixture::new();
    let xlsx = write_workbook(fx.data.path(), &scenario_rows());
    let mut workbook = Workbook::open(&xlsx).unwrap();

    assert!(fx.pipeline(false).run_sheet(&mut workbook, "Partners").await.is_err());
}

#[tokio::test]
async fn test_failed_upload_keeps_report_and_local_document() {
    let fx = Fixture::new();
    let xlsx = write_workbook(fx.data.path(), &scenario_rows());
    let mut workbook = Workbook::open(&xlsx).unwrap();

    // A bucket rooted at a regular file rejects every write
    let blocked = fx.bucket.path().join("not-a-dir");
    std::fs::write(&blocked, "").unwrap();
    let dispatcher = Dispatcher::new(Arc::new(FsStore::new(&blocked)), "sg-dashboard");
    let pipeline = Pipeline::new(fx.config.clone(), Some(dispatcher)).unwrap();

    let report = pipeline
        .run_kinds(&mut workbook, &[ReportKind::DashboardLineChart])
        .await;

    assert!(report.all_ok());
    let dashboard = summary(&report, ReportKind::DashboardLineChart);
    assert!(dashboard.uploaded.is_empty());
    assert_eq!(dashboard.upload_failures.len(), 1);
    assert!(dashboard.upload_failures[0].starts_with("dashboard: "));
    assert!(report
        .status_lines()
        .iter()
        .any(|line| line.starts_with("    ✗ dashboard: ")));

    assert_eq!(
        read_json(&fx.config.dashboard_path())[1]["data"],
        json!([{"year": 2025, "data": [10.0, 20.0]}])
    );
}

#[tokio::test]
async fn test_string_entity_id_keeps_case_in_bucket() {
    let fx = Fixture::new();
    write_json(&fx.config.entity_codes_path(), &json!({"MH": {"id": "MH27"}}));
    let xlsx = write_workbook(fx.data.path(), &scenario_rows());
    let mut workbook = Workbook::open(&xlsx).unwrap();

    let report = fx
        .pipeline(true)
        .run_kinds(&mut workbook, &[ReportKind::StateLineCharts])
        .await;

    let states = summary(&report, ReportKind::StateLineCharts);
    assert_eq!(states.uploaded[0].remote_path, "sg-dashboard/states/MH27/line-chart.json");
    assert!(fx.config.states_dir().join("MH27/line-chart.json").is_file());
    assert!(fx.remote("states/MH27/line-chart.json").is_file());
}
