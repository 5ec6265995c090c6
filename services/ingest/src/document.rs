//! Report documents: JSON arrays of typed records behind one dashboard page
//!
//! Updates are read-modify-write on the whole document. Records that do not
//! match a selector keep their content and position; key order inside records
//! is preserved on rewrite.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};

/// Matches records whose discriminator field equals a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub field: String,
    pub value: String,
}

impl Selector {
    /// `type == value`, the discriminator every dashboard page uses
    pub fn type_eq(value: impl Into<String>) -> Self {
        Self {
            field: "type".to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        record
            .get(&self.field)
            .and_then(Value::as_str)
            .map(|v| v == self.value)
            .unwrap_or(false)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == \"{}\"", self.field, self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    records: Vec<Value>,
}

impl ReportDocument {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Value> {
        self.records
    }

    /// Read a document. Missing files are `DocumentNotFound`; anything that is
    /// not a JSON array is `DocumentMalformed` and the file is left as is.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestError::DocumentNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let value: Value =
            serde_json::from_str(&content).map_err(|e| IngestError::DocumentMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        match value {
            Value::Array(records) => Ok(Self { records }),
            _ => Err(IngestError::DocumentMalformed {
                path: path.to_path_buf(),
                reason: "expected a JSON array of records".to_string(),
            }),
        }
    }

    /// Atomically replace `path` with this document
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, &self.records)
    }

    /// Apply `update` to every record matching `selector`; returns how many
    /// records matched. Non-object records never match.
    pub fn update_matching<F>(&mut self, selector: &Selector, mut update: F) -> usize
    where
        F: FnMut(&mut Map<String, Value>),
    {
        let mut matched = 0;
        for record in self.records.iter_mut() {
            if !selector.matches(record) {
                continue;
            }
            if let Value::Object(fields) = record {
                update(fields);
                matched += 1;
            }
        }
        matched
    }

    /// Replace `field` of every matching record with `payload`
    pub fn merge(&mut self, selector: &Selector, field: &str, payload: &Value) -> usize {
        self.update_matching(selector, |fields| {
            fields.insert(field.to_string(), payload.clone());
        })
    }
}

/// Outcome of [`merge_into_file`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    pub path: PathBuf,
    pub replaced: usize,
}

/// Load `path`, apply `update` to records matching `selector`, write back.
/// Zero matches leave the file untouched and report `NoMatchingRecord`;
/// records are never appended.
pub fn update_file<F>(path: &Path, selector: &Selector, update: F) -> Result<MergeOutcome>
where
    F: FnMut(&mut Map<String, Value>),
{
    let mut document = ReportDocument::load(path)?;
    let replaced = document.update_matching(selector, update);

    if replaced == 0 {
        warn!(path = %path.display(), %selector, "No matching record, document unmodified");
        return Err(IngestError::NoMatchingRecord {
            path: path.to_path_buf(),
            selector: selector.to_string(),
        });
    }

    document.save(path)?;
    info!(path = %path.display(), %selector, replaced, "Updated document");

    Ok(MergeOutcome {
        path: path.to_path_buf(),
        replaced,
    })
}

/// [`update_file`] replacing one payload field
pub fn merge_into_file(
    path: &Path,
    selector: &Selector,
    field: &str,
    payload: &Value,
) -> Result<MergeOutcome> {
    update_file(path, selector, |fields| {
        fields.insert(field.to_string(), payload.clone());
    })
}

/// Pretty JSON with two-space indent, non-ASCII written as is
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Write through a temp file in the target directory, then rename over the
/// target, so a failed write never leaves a partial document behind.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = to_json_bytes(value)?;
    write_bytes_atomic(path, &bytes)
}

pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| IngestError::Io(e.error))?;

    debug!(path = %path.display(), size = bytes.len(), "Wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dashboard() -> ReportDocument {
        ReportDocument::new(vec![
            json!({"type": "big-numbers", "data": [1, 2, 3]}),
            json!({"type": "line-chart", "title": "Micro improvements", "data": []}),
            json!({"type": "pie-chart", "data": {"a": 1}}),
        ])
    }

    // -------------------------------------------------------------------------
    // MERGE TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_merge_replaces_only_matching() {
        let mut doc = dashboard();
        let payload = json!([{"year": 2025, "data": [10.0, 20.0]}]);
        let replaced = doc.merge(&Selector::type_eq("line-chart"), "data", &payload);

        assert_eq!(replaced, 1);
        assert_eq!(doc.records()[0], json!({"type": "big-numbers", "data": [1, 2, 3]}));
        assert_eq!(doc.records()[1]["data"], payload);
        assert_eq!(doc.records()[1]["title"], "Micro improvements");
        assert_eq!(doc.records()[2], json!({"type": "pie-chart", "data": {"a": 1}}));
    }

    #[test]
    fn test_merge_zero_matches_is_identity() {
        let mut doc = dashboard();
        let before = doc.clone();
        let replaced = doc.merge(&Selector::type_eq("bar-chart"), "data", &json!([]));
        assert_eq!(replaced, 0);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_merge_all_matching_records() {
        let mut doc = ReportDocument::new(vec![
            json!({"type": "line-chart", "data": 1}),
            json!("stray string"),
            json!({"type": "line-chart", "data": 2}),
        ]);
        assert_eq!(doc.merge(&Selector::type_eq("line-chart"), "data", &json!(0)), 2);
        assert_eq!(doc.records()[1], json!("stray string"));
    }

    #[test]
    fn test_merge_adds_missing_payload_field() {
        let mut doc = ReportDocument::new(vec![json!({"type": "line-chart"})]);
        doc.merge(&Selector::type_eq("line-chart"), "data", &json!([]));
        assert_eq!(doc.records()[0], json!({"type": "line-chart", "data": []}));
    }

    #[test]
    fn test_selector_display() {
        assert_eq!(Selector::type_eq("line-chart").to_string(), "type == \"line-chart\"");
    }

    // -------------------------------------------------------------------------
    // FILE TESTS
    // -------------------------------------------------------------------------

    #[test]
    fn test_merge_into_file_preserves_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        std::fs::write(
            &path,
            r#"[{"zeta": 1, "type": "line-chart", "alpha": 2, "data": []}, {"type": "other", "b": 1, "a": 2}]"#,
        )
        .unwrap();

        let outcome =
            merge_into_file(&path, &Selector::type_eq("line-chart"), "data", &json!([1.5])).unwrap();
        assert_eq!(outcome.replaced, 1);

        let written = std::fs::read_to_string(&path).unwrap();
        let zeta = written.find("\"zeta\"").unwrap();
        let alpha = written.find("\"alpha\"").unwrap();
        let b = written.find("\"b\"").unwrap();
        let a = written.find("\"a\"").unwrap();
        assert!(zeta < alpha);
        assert!(b < a);
        assert!(written.contains("1.5"));
    }

    #[test]
    fn test_merge_into_file_no_match_leaves_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        let original = r#"[{"type":"pie-chart","data":[]}]"#;
        std::fs::write(&path, original).unwrap();

        let err = merge_into_file(&path, &Selector::type_eq("line-chart"), "data", &json!([]))
            .unwrap_err();
        assert!(matches!(err, IngestError::NoMatchingRecord { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_missing_document() {
        let dir = tempfile::tempdir().unwrap();
        let err = ReportDocument::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, IngestError::DocumentNotFound(_)));
    }

    #[test]
    fn test_malformed_document_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.json");
        std::fs::write(&path, "[{\"type\": ").unwrap();

        let err = merge_into_file(&path, &Selector::type_eq("x"), "data", &json!(1)).unwrap_err();
        assert!(matches!(err, IngestError::DocumentMalformed { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{\"type\": ");
    }

    #[test]
    fn test_non_array_document_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.json");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            ReportDocument::load(&path).unwrap_err(),
            IngestError::DocumentMalformed { .. }
        ));
    }

    #[test]
    fn test_atomic_write_creates_parents_and_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("districts").join("521").join("line-chart.json");
        let value = json!({"data": [{"year": 2025, "data": [5.0]}]});

        write_json_atomic(&path, &value).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_json_atomic(&path, &value).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_unicode_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voices.json");
        write_json_atomic(&path, &json!([{"label": "शिक्षा चौपाल"}])).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("शिक्षा चौपाल"));
    }
}
