//
// identifiers.rs
// Dicom-Deid-rs
//
// Subject-identifier remapping: either a one-to-one CSV table or a single override id for the whole run.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::HashMap;
use std::path::Path;

use crate::error::{DeidError, Result};

/// The two mutually exclusive remapping policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierMap {
    /// old subject id -> new subject id
    Table(HashMap<String, String>),
    /// every item receives the same replacement id
    Override(String),
}

impl IdentifierMap {
    /// Build the map once per run. An explicit override wins over the table.
    pub fn build(explicit_override: Option<&str>, table: Option<&Path>) -> Result<Self> {
        if let Some(value) = explicit_override {
            let value = value.trim();
            if value.is_empty() {
                return Err(DeidError::Config("override subject id is empty".into()));
            }
            return Ok(IdentifierMap::Override(value.to_string()));
        }

        match table {
            Some(path) => Self::load_table(path),
            None => Err(DeidError::Config(
                "no identifier table (new_IDs) configured and no override subject id given".into(),
            )),
        }
    }

    /// Read a header-less `old,new` CSV. Any malformed row fails the whole load.
    pub fn load_table(path: &Path) -> Result<Self> {
        let bad = |reason: String| DeidError::Config(format!("{}: {}", path.display(), reason));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| bad(e.to_string()))?;

        let mut pairs = HashMap::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| bad(e.to_string()))?;
            let line = line + 1;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let (old, new) = match (record.get(0), record.get(1)) {
                (Some(old), Some(new)) if !old.is_empty() && !new.is_empty() => (old, new),
                _ => return Err(bad(format!("row {line} must hold two non-empty ids"))),
            };
            if let Some(previous) = pairs.insert(old.to_string(), new.to_string()) {
                if previous != new {
                    return Err(bad(format!(
                        "row {line} maps a subject id already mapped to a different value"
                    )));
                }
            }
        }

        if pairs.is_empty() {
            return Err(bad("identifier table is empty".into()));
        }
        Ok(IdentifierMap::Table(pairs))
    }

    /// `None` means UNKNOWN: the caller must skip the item, never reuse `source_id`.
    pub fn resolve(&self, source_id: &str) -> Option<&str> {
        match self {
            IdentifierMap::Table(pairs) => pairs.get(source_id.trim()).map(String::as_str),
            IdentifierMap::Override(value) => Some(value),
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, IdentifierMap::Override(_))
    }

    pub fn len(&self) -> usize {
        match self {
            IdentifierMap::Table(pairs) => pairs.len(),
            IdentifierMap::Override(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
