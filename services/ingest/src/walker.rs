//! Sheet row walker for the quarterly progress sheet
//!
//! Column contract (positional, A..G):
//!   state name | district name | year | Q1 | Q2 | Q3 | Q4
//!
//! Rows are read from row 2 until a row with both name cells empty. Sheets
//! carry trailing padding and no row count, so the blank-name sentinel is the
//! only end marker.

use calamine::Data;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::entity_codes::{EntityCodes, EntityId};
use crate::error::{IngestError, Result};
use crate::quarters::{quarter_values, QuarterValues, YearBuckets};
use crate::workbook::{cell_text, Sheet};

pub const QUARTERLY_COLUMNS: [&str; 7] = ["State", "District", "Year", "Q1", "Q2", "Q3", "Q4"];

const STATE_COL: u32 = 0;
const DISTRICT_COL: u32 = 1;
const YEAR_COL: u32 = 2;
const FIRST_QUARTER_COL: u32 = 3;

/// What a row is, decided only by which name cells are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// District cell empty: the state's own total
    StateTotal,
    /// District cell filled
    District,
    /// Both name cells empty: end of data
    Terminator,
}

pub fn classify(state: &str, district: &str) -> RowKind {
    match (state.trim().is_empty(), district.trim().is_empty()) {
        (true, true) => RowKind::Terminator,
        (_, true) => RowKind::StateTotal,
        (_, false) => RowKind::District,
    }
}

/// Which rows an aggregation consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// State totals summed together, no entity split
    Unsplit,
    /// State totals keyed by state id
    State,
    /// District rows keyed by district id
    District,
}

impl Scope {
    fn accepts(self, kind: RowKind) -> bool {
        match self {
            Scope::Unsplit | Scope::State => kind == RowKind::StateTotal,
            Scope::District => kind == RowKind::District,
        }
    }
}

/// One validated data row
#[derive(Debug, Clone, PartialEq)]
pub struct QuarterRow {
    /// 1-based, as shown in the spreadsheet
    pub row: u32,
    pub state: String,
    pub district: Option<String>,
    pub year: Option<i32>,
    pub values: QuarterValues,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub rows_seen: usize,
    pub accepted: usize,
    pub out_of_scope: usize,
    pub unresolved: usize,
    pub malformed: usize,
    pub outside_years: usize,
}

impl WalkSummary {
    pub fn skipped(&self) -> usize {
        self.unresolved + self.malformed
    }
}

/// Year cell as an integer year; anything else is `None`
pub fn year_value(cell: &Data) -> Option<i32> {
    match cell {
        Data::Int(i) => i32::try_from(*i).ok(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i32::MAX as f64 => Some(*f as i32),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_row(sheet: &Sheet, row: u32, state: String, district: String) -> Result<QuarterRow> {
    let cells: [Data; 4] = std::array::from_fn(|i| sheet.cell(row, FIRST_QUARTER_COL + i as u32).clone());
    let values = quarter_values(&cells)?;

    Ok(QuarterRow {
        row: row + 1,
        state,
        district: if district.is_empty() { None } else { Some(district) },
        year: year_value(sheet.cell(row, YEAR_COL)),
        values,
    })
}

/// Walk data rows in `scope`, handing each to `visit`. Row-level errors from
/// reading or from `visit` skip that row; any other error stops the walk.
pub fn walk<F>(sheet: &Sheet, scope: Scope, mut visit: F) -> Result<WalkSummary>
where
    F: FnMut(&QuarterRow) -> Result<()>,
{
    sheet.require_width(&QUARTERLY_COLUMNS)?;

    let mut summary = WalkSummary::default();
    let mut row = 1u32;

    loop {
        let state = cell_text(sheet.cell(row, STATE_COL));
        let district = cell_text(sheet.cell(row, DISTRICT_COL));
        let kind = classify(&state, &district);

        if kind == RowKind::Terminator {
            debug!(sheet = sheet.name(), row = row + 1, "Reached terminator row");
            break;
        }

        summary.rows_seen += 1;
        row += 1;

        if !scope.accepts(kind) {
            summary.out_of_scope += 1;
            continue;
        }

        match read_row(sheet, row - 1, state, district).and_then(|r| visit(&r)) {
            Ok(()) => summary.accepted += 1,
            Err(e) if e.is_row_level() => {
                warn!(sheet = sheet.name(), row, error = %e, "Skipping row");
                match e {
                    IngestError::UnresolvedEntity { .. } => summary.unresolved += 1,
                    _ => summary.malformed += 1,
                }
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}

/// Sum every state-total row into one set of year buckets
pub fn aggregate_unsplit(sheet: &Sheet, years: &[i32]) -> Result<(YearBuckets, WalkSummary)> {
    let mut buckets = YearBuckets::new(years);
    let mut outside_years = 0;

    let mut summary = walk(sheet, Scope::Unsplit, |row| {
        let added = row
            .year
            .map(|year| buckets.accumulate(year, row.values))
            .unwrap_or(false);
        if added {
            debug!(row = row.row, year = ?row.year, "Accumulated state total");
        } else {
            outside_years += 1;
        }
        Ok(())
    })?;

    summary.outside_years = outside_years;
    Ok((buckets, summary))
}

/// Year buckets per resolved state (`Scope::State`) or district
/// (`Scope::District`). An entity is registered as soon as one of its rows
/// resolves, even when that row's year is unknown.
pub fn aggregate_by_entity(
    sheet: &Sheet,
    scope: Scope,
    codes: &EntityCodes,
    years: &[i32],
) -> Result<(BTreeMap<EntityId, YearBuckets>, WalkSummary)> {
    if scope == Scope::Unsplit {
        return Err(IngestError::InvalidInput(
            "entity aggregation needs the state or district scope".to_string(),
        ));
    }

    let mut entities: BTreeMap<EntityId, YearBuckets> = BTreeMap::new();
    let mut outside_years = 0;

    let mut summary = walk(sheet, scope, |row| {
        let resolved = codes.resolve(&row.state, row.district.as_deref())?;
        let id = match scope {
            Scope::District => resolved.district_id.ok_or_else(|| IngestError::UnresolvedEntity {
                state: row.state.clone(),
                district: row.district.clone(),
            })?,
            _ => resolved.state_id,
        };

        let buckets = entities
            .entry(id)
            .or_insert_with(|| YearBuckets::new(years));

        let added = row
            .year
            .map(|year| buckets.accumulate(year, row.values))
            .unwrap_or(false);
        if !added {
            outside_years += 1;
        }
        Ok(())
    })?;

    summary.outside_years = outside_years;
    Ok((entities, summary))
}
