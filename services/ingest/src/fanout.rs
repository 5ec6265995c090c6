//! One document per entity: `<root>/<entity id>/<file name>` holding
//! `{"data": YearSeries}`.
//!
//! Writing the same input twice gives byte-identical files. Entity
//! directories not in the current input are never touched.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::document::write_json_atomic;
use crate::entity_codes::EntityId;
use crate::error::Result;
use crate::quarters::YearSeries;

#[derive(Serialize)]
struct EntityDocument<'a> {
    data: &'a YearSeries,
}

pub fn entity_path(root: &Path, id: &EntityId, file_name: &str) -> PathBuf {
    root.join(id.as_str()).join(file_name)
}

/// Write every entity's series; returns the written paths in id order
pub fn fanout(
    root: &Path,
    file_name: &str,
    results: &BTreeMap<EntityId, YearSeries>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(results.len());

    for (id, series) in results {
        let path = entity_path(root, id, file_name);
        write_json_atomic(&path, &EntityDocument { data: series })?;
        written.push(path);
    }

    info!(
        root = %root.display(),
        entities = written.len(),
        "Wrote per-entity {}",
        file_name
    );
    Ok(written)
}
