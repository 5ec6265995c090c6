//! Ingest - Turns program workbooks into dashboard documents
//!
//! Responsibilities:
//! - Find the declared sheets and check their column contracts
//! - Resolve state/district names to stable ids
//! - Aggregate quarterly values into per-year series
//! - Merge results into page documents, or fan out one file per entity
//! - Publish written documents through the storage collaborator
//!
//! Row problems skip the row. Sheet and document problems fail only the
//! report that hit them.

pub mod config;
pub mod dispatch;
pub mod document;
pub mod entity_codes;
pub mod error;
pub mod fanout;
pub mod icons;
pub mod logging;
pub mod pages;
pub mod pipeline;
pub mod quarters;
pub mod reports;
pub mod walker;
pub mod workbook;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use pipeline::{BatchReport, Pipeline, ReportOutcome, RunSummary};
pub use reports::ReportKind;
