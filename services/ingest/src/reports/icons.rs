//! Icon rows from the "Images/icons" sheet
//!
//! Each row names an icon and links to it on Drive. The handler only plans
//! the work: fetch into scratch space, upload, drop the scratch file.

use tracing::warn;

use super::{PlannedUpload, ReportOutput};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::icons::{clean_name, drive_download_url, drive_file_id, icon_logical_name};
use crate::walker::WalkSummary;
use crate::workbook::{cell_text, Sheet};

pub const ICON_COLUMNS: [&str; 2] = ["Name of images", "Link of images"];

pub fn icons(sheet: &Sheet, config: &IngestConfig) -> Result<ReportOutput> {
    let columns = sheet.require_columns(&ICON_COLUMNS)?;
    let (name_col, link_col) = (columns[0] as u32, columns[1] as u32);
    let scratch = config.scratch_dir();

    let mut summary = WalkSummary::default();
    let mut output = ReportOutput::default();

    for row in 1..=sheet.last_row().unwrap_or(0) {
        let name = cell_text(sheet.cell(row, name_col));
        let link = cell_text(sheet.cell(row, link_col));
        if name.is_empty() || link.is_empty() {
            continue;
        }
        summary.rows_seen += 1;

        let Some(file_id) = drive_file_id(&link) else {
            warn!(sheet = sheet.name(), row = row + 1, link = %link, "No file id in link, skipping");
            summary.malformed += 1;
            output.notes.push(format!("No file ID found (row {})", row + 1));
            continue;
        };

        let clean = clean_name(&name);
        if clean.is_empty() {
            warn!(sheet = sheet.name(), row = row + 1, name = %name, "Icon name has no usable characters");
            summary.malformed += 1;
            output.notes.push(format!("Unusable icon name '{}' (row {})", name, row + 1));
            continue;
        }

        summary.accepted += 1;
        output.uploads.push(PlannedUpload {
            local_path: scratch.join(format!("{}.svg", clean)),
            logical_name: icon_logical_name(&clean),
            fetch_from: Some(drive_download_url(&file_id)),
            remove_after: true,
            exact_path: false,
        });
    }

    output.walk = Some(summary);
    Ok(output)
}
