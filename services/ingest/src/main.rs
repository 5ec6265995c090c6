//! Ingest CLI - Runs workbook reports and manages page documents
//!
//! Usage:
//!   # Which sheets of a workbook feed a report:
//!   cargo run --bin ingest -- sheets ./progress.xlsx
//!
//!   # Every report bound to one sheet:
//!   cargo run --bin ingest -- run ./progress.xlsx --sheet "Micro improvements progress"
//!
//!   # Everything, without uploading:
//!   cargo run --bin ingest -- --no-upload run-all ./progress.xlsx
//!
//!   # Refresh a page from the bucket:
//!   cargo run --bin ingest -- pull "Voices from the ground"

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ingest::dispatch::Dispatcher;
use ingest::icons::{undo_icon, upload_icon};
use ingest::logging::{init_logging, LogFormat};
use ingest::pages::{find_page, pull_page, push_page, PAGE_NAMES};
use ingest::reports::recognized_sheets;
use ingest::workbook::Workbook;
use ingest::{BatchReport, IngestConfig, Pipeline, ReportKind};
use std::path::PathBuf;
use storage::{build_store, StorageConfig};

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Loads program workbooks into dashboard documents")]
struct Args {
    /// Directory holding pages/, states/ and districts/ (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Write local documents only, skip every upload
    #[arg(long, global = true, default_value = "false")]
    no_upload: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List workbook sheets and the reports they feed
    Sheets { workbook: PathBuf },
    /// Run the reports bound to one sheet, or a single report
    Run {
        workbook: PathBuf,
        #[arg(long, conflicts_with = "report", required_unless_present = "report")]
        sheet: Option<String>,
        /// Report name, e.g. district-line-charts
        #[arg(long)]
        report: Option<String>,
    },
    /// Run every report, each independent of the others
    RunAll { workbook: PathBuf },
    /// Upload one SVG icon from disk
    UploadIcon {
        file: PathBuf,
        #[arg(long)]
        name: String,
    },
    /// Delete a previously uploaded icon
    UndoIcon { blob_path: String },
    /// Download a page document from the bucket into pages/
    Pull { page: String },
    /// Validate and upload a page document from pages/
    Push { page: String },
}

fn dispatcher(config: &IngestConfig) -> Result<Dispatcher> {
    let storage_config = StorageConfig::from_env().context("Invalid storage configuration")?;
    let store = build_store(&storage_config).context("Failed to build storage backend")?;
    println!("Storage: {}", store.location());
    Ok(Dispatcher::new(store, config.remote_prefix.clone()))
}

fn print_report(report: &BatchReport) {
    println!("\n=== Report Summary ===");
    for line in report.status_lines() {
        println!("{}", line);
    }
    println!("Succeeded: {}", report.succeeded());
    println!("Failed: {}", report.failed());
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging(LogFormat::from_env()?, "info")?;

    let args = Args::parse();
    let mut config = IngestConfig::from_env().context("Invalid ingest configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if args.no_upload {
        config.upload_enabled = false;
    }

    println!("=== Dashboard Ingest ===");
    println!("Data dir: {}", config.data_dir.display());

    let report = match args.command {
        Command::Sheets { workbook } => {
            let workbook = Workbook::open(&workbook)
                .with_context(|| format!("Failed to open workbook {}", workbook.display()))?;
            let names = workbook.sheet_names();
            let recognized = recognized_sheets(&names);

            println!("\nSheets in {}:", workbook.path().display());
            println!("{:-<60}", "");
            for name in &names {
                match recognized.iter().find(|(n, _)| n == name) {
                    Some((_, kinds)) => {
                        let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
                        println!("  ✓ {} -> {}", name, kinds.join(", "));
                    }
                    None => println!("    {}", name),
                }
            }
            println!("{:-<60}", "");
            println!("{} of {} sheet(s) recognized", recognized.len(), names.len());
            return Ok(());
        }
        Command::Run {
            workbook,
            sheet,
            report,
        } => {
            let pipeline = build_pipeline(&config)?;
            let mut workbook = Workbook::open(&workbook)
                .with_context(|| format!("Failed to open workbook {}", workbook.display()))?;
            match (sheet, report) {
                (_, Some(name)) => {
                    let kind: ReportKind = name.parse()?;
                    pipeline.run_kinds(&mut workbook, &[kind]).await
                }
                (Some(sheet), None) => pipeline.run_sheet(&mut workbook, &sheet).await?,
                (None, None) => bail!("Pass --sheet or --report"),
            }
        }
        Command::RunAll { workbook } => {
            let pipeline = build_pipeline(&config)?;
            let mut workbook = Workbook::open(&workbook)
                .with_context(|| format!("Failed to open workbook {}", workbook.display()))?;
            pipeline.run_all(&mut workbook).await
        }
        Command::UploadIcon { file, name } => {
            let dispatcher = dispatcher(&config)?;
            let upload = upload_icon(&dispatcher, &file, &name)
                .await
                .context("Icon upload failed")?;
            println!("✓ {} -> {}", file.display(), upload.url);
            println!("  Blob: {}", upload.blob_path);
            println!("  Undo with: ingest undo-icon {}", upload.blob_path);
            return Ok(());
        }
        Command::UndoIcon { blob_path } => {
            let dispatcher = dispatcher(&config)?;
            undo_icon(&**dispatcher.store(), &blob_path)
                .await
                .context("Icon removal failed")?;
            println!("✓ Removed {}", blob_path);
            return Ok(());
        }
        Command::Pull { page } => {
            let page = find_page(&page)?;
            let dispatcher = dispatcher(&config)?;
            let pulled = pull_page(&dispatcher, &config, page)
                .await
                .with_context(|| format!("Failed to pull '{}'", page))?;
            println!("✓ {} ({:?}) -> {}", page, pulled.source, pulled.path.display());
            return Ok(());
        }
        Command::Push { page } => {
            let page = find_page(&page)
                .with_context(|| format!("Known pages: {}", PAGE_NAMES.join(", ")))?;
            let dispatcher = dispatcher(&config)?;
            let receipt = push_page(&dispatcher, &config, page)
                .await
                .with_context(|| format!("Failed to push '{}'", page))?;
            println!("✓ {} -> {}", page, receipt.url);
            return Ok(());
        }
    };

    print_report(&report);
    if !report.all_ok() {
        std::process::exit(report.exit_code());
    }
    Ok(())
}

fn build_pipeline(config: &IngestConfig) -> Result<Pipeline> {
    let dispatcher = if config.upload_enabled {
        Some(dispatcher(config)?)
    } else {
        println!("Uploads: disabled");
        None
    };
    Ok(Pipeline::new(config.clone(), dispatcher)?)
}
