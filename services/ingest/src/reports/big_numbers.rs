//! Voices page headline indicators from the "Voices tab_Big numbers" sheet

use calamine::Data;
use serde_json::Value;
use tracing::{info, warn};

use super::{PlannedUpload, ReportOutput};
use crate::config::IngestConfig;
use crate::document::{update_file, Selector};
use crate::error::Result;
use crate::workbook::Sheet;

/// Indicator columns, in the order the page lists its indicators
pub const INDICATOR_COLUMNS: [&str; 6] = [
    "Shiksha Chaupals",
    "Community members participating in dialogues",
    "Local challenges identified",
    "Community leaders driving improvements",
    "Local solutions identified",
    "Local Solutions implemented",
];

const INDICATORS_RECORD: &str = "data-indicators";

/// Integer part of a numeric cell; text, blanks and the rest count as nothing
fn whole_number(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}

/// Column totals for every indicator, over all rows below the header
pub fn indicator_totals(sheet: &Sheet) -> Result<Vec<i64>> {
    let columns = sheet.require_columns(&INDICATOR_COLUMNS)?;
    let last_row = sheet.last_row().unwrap_or(0);

    let totals = columns
        .iter()
        .map(|&col| {
            (1..=last_row)
                .filter_map(|row| whole_number(sheet.cell(row, col as u32)))
                .fold(0i64, i64::saturating_add)
        })
        .collect();

    Ok(totals)
}

pub fn voices_big_numbers(sheet: &Sheet, config: &IngestConfig) -> Result<ReportOutput> {
    let totals = indicator_totals(sheet)?;
    for (name, total) in INDICATOR_COLUMNS.iter().zip(&totals) {
        info!(indicator = *name, total = *total, "Indicator total");
    }

    let path = config.voices_path();
    let mut notes = Vec::new();

    update_file(&path, &Selector::type_eq(INDICATORS_RECORD), |record| {
        let Some(Value::Array(indicators)) = record.get_mut("indicators") else {
            return;
        };
        for (i, indicator) in indicators.iter_mut().enumerate() {
            let Value::Object(fields) = indicator else {
                continue;
            };
            let label = fields
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            match totals.get(i) {
                Some(&total) => {
                    fields.insert("value".to_string(), Value::from(total));
                }
                None => {
                    warn!(indicator = %label, "No matching total in the sheet, left unchanged");
                    notes.push(format!("Indicator '{}' has no total in the sheet", label));
                }
            }
        }
    })?;

    Ok(ReportOutput {
        walk: None,
        written: vec![path.clone()],
        uploads: vec![PlannedUpload::document(path, "voices-from-the-ground")],
        notes,
    })
}
