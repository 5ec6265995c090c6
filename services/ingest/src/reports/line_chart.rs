//! Quarterly line charts from the "Micro improvements progress" sheet

use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use super::{PlannedUpload, ReportOutput};
use crate::config::IngestConfig;
use crate::document::{merge_into_file, Selector};
use crate::entity_codes::{EntityCodes, EntityId};
use crate::error::Result;
use crate::fanout::fanout;
use crate::quarters::{YearBuckets, YearSeries};
use crate::walker::{aggregate_by_entity, aggregate_unsplit, Scope, WalkSummary};
use crate::workbook::Sheet;

pub const LINE_CHART_FILE: &str = "line-chart.json";

const DASHBOARD_RECORD: &str = "line-chart";
const VOICES_RECORD: &str = "micro-improvements-so-far";

/// Merge one unsplit series into a page document and plan its upload
fn merge_series(
    sheet: &Sheet,
    years: &[i32],
    path: &Path,
    record_type: &str,
    logical_name: &str,
) -> Result<ReportOutput> {
    let (buckets, walk) = aggregate_unsplit(sheet, years)?;
    let payload = serde_json::to_value(buckets.series())?;

    merge_into_file(path, &Selector::type_eq(record_type), "data", &payload)?;

    Ok(ReportOutput {
        written: vec![path.to_path_buf()],
        uploads: vec![PlannedUpload::document(path.to_path_buf(), logical_name)],
        notes: skip_notes(&walk),
        walk: Some(walk),
    })
}

/// State totals across all states, every configured year, into the dashboard
pub fn dashboard(sheet: &Sheet, config: &IngestConfig) -> Result<ReportOutput> {
    merge_series(
        sheet,
        &config.years,
        &config.dashboard_path(),
        DASHBOARD_RECORD,
        "dashboard",
    )
}

/// Same totals restricted to the voices year, into the voices page
pub fn voices(sheet: &Sheet, config: &IngestConfig) -> Result<ReportOutput> {
    merge_series(
        sheet,
        &[config.voices_year],
        &config.voices_path(),
        VOICES_RECORD,
        "voices-from-the-ground",
    )
}

pub fn states(sheet: &Sheet, config: &IngestConfig) -> Result<ReportOutput> {
    per_entity(sheet, config, Scope::State, &config.states_dir())
}

pub fn districts(sheet: &Sheet, config: &IngestConfig) -> Result<ReportOutput> {
    per_entity(sheet, config, Scope::District, &config.districts_dir())
}

fn per_entity(
    sheet: &Sheet,
    config: &IngestConfig,
    scope: Scope,
    root: &Path,
) -> Result<ReportOutput> {
    let codes = EntityCodes::load(&config.entity_codes_path())?;
    let (entities, walk) = aggregate_by_entity(sheet, scope, &codes, &config.years)?;

    let series = to_series(&entities);
    let written = fanout(root, LINE_CHART_FILE, &series)?;

    let uploads = written
        .iter()
        .map(|path| PlannedUpload::entity_file(path.clone(), config.relative_name(path)))
        .collect();

    info!(
        sheet = sheet.name(),
        scope = ?scope,
        entities = series.len(),
        skipped = walk.skipped(),
        "Aggregated per-entity line charts"
    );

    Ok(ReportOutput {
        notes: skip_notes(&walk),
        walk: Some(walk),
        written,
        uploads,
    })
}

fn to_series(entities: &BTreeMap<EntityId, YearBuckets>) -> BTreeMap<EntityId, YearSeries> {
    entities
        .iter()
        .map(|(id, buckets)| (id.clone(), buckets.series()))
        .collect()
}

fn skip_notes(walk: &WalkSummary) -> Vec<String> {
    let mut notes = Vec::new();
    if walk.unresolved > 0 {
        notes.push(format!("{} row(s) with unknown state/district skipped", walk.unresolved));
    }
    if walk.malformed > 0 {
        notes.push(format!("{} row(s) with malformed quarter values skipped", walk.malformed));
    }
    notes
}
