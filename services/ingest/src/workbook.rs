//! Workbook access: sheet discovery by normalized name and header checks

use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{IngestError, Result};

static EMPTY: Data = Data::Empty;

/// Lowercase and keep only `[a-z0-9]`, so "Images/icons" matches "Imagesicons"
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Cell rendered as trimmed text; numbers use their display form
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

pub struct Workbook {
    path: PathBuf,
    sheets: Sheets<BufReader<File>>,
}

impl Workbook {
    /// Open xlsx/xls/xlsb/ods, format detected from the extension
    pub fn open(path: &Path) -> Result<Self> {
        let sheets = open_workbook_auto(path)?;
        debug!("Opened workbook {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            sheets,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.sheet_names().to_vec()
    }

    /// Actual sheet name matching `declared` after normalization
    pub fn find_sheet_name(&self, declared: &str) -> Result<String> {
        let wanted = normalize_name(declared);
        let names = self.sheet_names();
        names
            .iter()
            .find(|name| normalize_name(name) == wanted)
            .cloned()
            .ok_or_else(|| IngestError::SheetNotFound {
                sheet: declared.to_string(),
                available: names.clone(),
            })
    }

    pub fn sheet(&mut self, declared: &str) -> Result<Sheet> {
        let name = self.find_sheet_name(declared)?;
        let range = self.sheets.worksheet_range(&name)?;
        debug!(sheet = %name, size = ?range.get_size(), "Loaded sheet");
        Ok(Sheet::new(name, range))
    }
}

/// One worksheet's cells. Row and column numbers are zero-based and absolute,
/// so row 0 is the header row regardless of where data starts.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    range: Range<Data>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, range: Range<Data>) -> Self {
        Self {
            name: name.into(),
            range,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cell at an absolute position; outside the used range reads as empty
    pub fn cell(&self, row: u32, col: u32) -> &Data {
        self.range.get_value((row, col)).unwrap_or(&EMPTY)
    }

    /// Last used row index, if the sheet has any cells
    pub fn last_row(&self) -> Option<u32> {
        self.range.end().map(|(row, _)| row)
    }

    pub fn width(&self) -> u32 {
        self.range.end().map(|(_, col)| col + 1).unwrap_or(0)
    }

    /// Header row, trimmed, keeping column positions
    pub fn headers(&self) -> Vec<String> {
        (0..self.width()).map(|col| cell_text(self.cell(0, col))).collect()
    }

    /// Column index of each expected header, or `MissingColumns`
    pub fn require_columns(&self, expected: &[&str]) -> Result<Vec<usize>> {
        let headers = self.headers();
        let mut indices = Vec::with_capacity(expected.len());
        let mut missing = Vec::new();

        for name in expected {
            let wanted = name.trim();
            match headers.iter().position(|h| h == wanted) {
                Some(idx) => indices.push(idx),
                None => missing.push(wanted.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(IngestError::MissingColumns {
                sheet: self.name.clone(),
                missing,
            })
        }
    }

    /// Cells up to the last non-empty header; data rows wider than this do
    /// not count
    pub fn header_width(&self) -> usize {
        let headers = self.headers();
        headers.iter().rposition(|h| !h.is_empty()).map_or(0, |i| i + 1)
    }

    /// Positional contracts only check that the header row is wide enough
    pub fn require_width(&self, columns: &[&str]) -> Result<()> {
        let width = self.header_width();
        if width >= columns.len() {
            return Ok(());
        }
        Err(IngestError::MissingColumns {
            sheet: self.name.clone(),
            missing: columns[width..].iter().map(|c| c.to_string()).collect(),
        })
    }
}
