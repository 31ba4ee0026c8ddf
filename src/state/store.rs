use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::types::Table;

/// The persisted document: recorded descriptors keyed by resource id, plus
/// the timestamp of the last successful commit.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub resources: BTreeMap<String, Value>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// JSON-file state store. Loaded once per run, mutated in memory by the
/// reconciler after each successful DDL, and written back by `commit`.
pub struct StateStore {
    path: PathBuf,
    doc: StateDocument,
}

impl StateStore {
    /// Load the state file. A missing file yields an empty document; a
    /// malformed one is reported and treated as empty rather than aborting
    /// the run.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "State file is not valid JSON; starting from an empty state"
                    );
                    StateDocument::default()
                }
            },
            Err(_) => StateDocument::default(),
        };
        Self { path, doc }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_exists(&self) -> bool {
        self.path.exists()
    }

    pub fn get(&self, resource_id: &str) -> Option<&Value> {
        self.doc.resources.get(resource_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.doc.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.doc.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.resources.is_empty()
    }

    /// Record a table descriptor. Replaces any previous entry for the id.
    pub fn put(&mut self, resource_id: &str, table: &Table) -> Result<()> {
        let value = serde_json::to_value(table).context("failed to serialize table descriptor")?;
        self.doc.resources.insert(resource_id.to_string(), value);
        Ok(())
    }

    /// Forget a resource. No-op when the id is unknown.
    pub fn remove(&mut self, resource_id: &str) {
        self.doc.resources.remove(resource_id);
    }

    /// Stamp `last_updated` and write the document atomically: the JSON goes
    /// to a temp sibling which is then renamed over the state file, so a
    /// crash mid-write can never leave a truncated document behind.
    pub fn commit(&mut self) -> Result<()> {
        self.doc.last_updated = Some(chrono::Utc::now().to_rfc3339());

        let json = serde_json::to_string_pretty(&self.doc)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(&self.path)
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        Ok(())
    }
}

/// Parse a recorded descriptor back into a table. Done per resource at plan
/// time so a single corrupt entry cannot poison the whole document.
pub fn parse_recorded(resource_id: &str, value: &Value) -> Result<Table> {
    let mut table: Table = serde_json::from_value(value.clone()).with_context(|| {
        format!(
            "recorded descriptor for resource '{}' does not parse",
            resource_id
        )
    })?;
    table.resource_id = resource_id.to_string();
    Ok(table)
}
