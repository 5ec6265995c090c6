//! State/district name to stable id lookup
//!
//! Source table (`state_code_details.json`):
//!
//! ```json
//! { "Maharashtra": { "id": 27, "Pune": 521, "Nashik": 516 } }
//! ```
//!
//! Each state object carries its own `id`; every other key is a district name
//! under that state.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Identifier of a state or district, kept as text so numeric and string ids
/// round-trip the same way into directory names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self(i.to_string()))
                } else {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0)
                        .map(|f| Self((f as i64).to_string()))
                }
            }
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    pub state_id: EntityId,
    pub district_id: Option<EntityId>,
}

#[derive(Debug, Clone, Default)]
struct StateEntry {
    id: Option<EntityId>,
    districts: BTreeMap<String, EntityId>,
}

#[derive(Debug, Clone, Default)]
pub struct EntityCodes {
    states: BTreeMap<String, StateEntry>,
}

impl EntityCodes {
    /// Load the table from disk. A missing file is `EntityCodesUnavailable`
    /// so callers can surface it without treating it as corruption.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestError::EntityCodesUnavailable(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let value: Value = serde_json::from_str(&content).map_err(|e| {
            IngestError::DocumentMalformed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let codes = Self::from_value(&value).ok_or_else(|| IngestError::DocumentMalformed {
            path: path.to_path_buf(),
            reason: "expected an object keyed by state name".to_string(),
        })?;

        debug!(states = codes.states.len(), "Loaded entity codes from {}", path.display());
        Ok(codes)
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut states = BTreeMap::new();

        for (state_name, state_value) in object {
            let Some(fields) = state_value.as_object() else {
                warn!(state = %state_name, "Entity code entry is not an object, ignoring");
                continue;
            };

            let mut entry = StateEntry::default();
            for (key, raw) in fields {
                let Some(id) = EntityId::from_json(raw) else {
                    warn!(state = %state_name, key = %key, "Entity code value is not an id, ignoring");
                    continue;
                };
                if key == "id" {
                    entry.id = Some(id);
                } else {
                    entry.districts.insert(key.trim().to_string(), id);
                }
            }
            states.insert(state_name.trim().to_string(), entry);
        }

        Some(Self { states })
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Resolve a state, and a district under it when one is given.
    pub fn resolve(&self, state_name: &str, district_name: Option<&str>) -> Result<ResolvedEntity> {
        let state_name = state_name.trim();
        let district_name = district_name.map(str::trim).filter(|d| !d.is_empty());

        let unresolved = || IngestError::UnresolvedEntity {
            state: state_name.to_string(),
            district: district_name.map(str::to_string),
        };

        let state = lookup(&self.states, state_name).ok_or_else(unresolved)?;
        let state_id = state.id.clone().ok_or_else(unresolved)?;

        let district_id = match district_name {
            Some(name) => Some(lookup(&state.districts, name).cloned().ok_or_else(unresolved)?),
            None => None,
        };

        Ok(ResolvedEntity {
            state_id,
            district_id,
        })
    }
}

/// Exact key first, then a case-insensitive match if exactly one key fits
fn lookup<'a, V>(map: &'a BTreeMap<String, V>, name: &str) -> Option<&'a V> {
    if let Some(v) = map.get(name) {
        return Some(v);
    }
    let folded = name.to_lowercase();
    let mut matches = map.iter().filter(|(k, _)| k.to_lowercase() == folded);
    match (matches.next(), matches.next()) {
        (Some((_, v)), None) => Some(v),
        _ => None,
    }
}
