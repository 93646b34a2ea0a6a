use crate::common::paths::write_atomic;
use crate::common::{FacegateError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Sentinel label for low-confidence or unmapped predictions.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Persisted mapping from PersonDirectoryKey to human display name. The two
/// are distinct namespaces: directory keys must be unique, display names may
/// collide. The map always carries the "Unknown" sentinel entry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameMap {
    entries: BTreeMap<String, String>,
}

impl Default for NameMap {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(UNKNOWN_LABEL.to_string(), UNKNOWN_LABEL.to_string());
        Self { entries }
    }
}

impl NameMap {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut map: NameMap = serde_json::from_str(&data)?;
        // Older files may predate the sentinel entry.
        map.entries
            .entry(UNKNOWN_LABEL.to_string())
            .or_insert_with(|| UNKNOWN_LABEL.to_string());
        Ok(map)
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self)?;
        write_atomic(path, json.as_bytes())
    }

    pub fn insert(&mut self, person_key: &str, display_name: &str) {
        self.entries
            .insert(person_key.to_string(), display_name.to_string());
    }

    pub fn contains(&self, person_key: &str) -> bool {
        self.entries.contains_key(person_key)
    }

    /// Translate a classifier label. Any label without an entry is treated
    /// as the unknown sentinel.
    pub fn display_name(&self, person_key: &str) -> &str {
        self.entries
            .get(person_key)
            .map(|s| s.as_str())
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Every person directory in the corpus must have a mapping entry;
    /// a missing one means the two namespaces have drifted apart.
    pub fn validate_against_corpus(&self, corpus_dir: &Path) -> Result<()> {
        for entry in fs::read_dir(corpus_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_string();
            if !self.contains(&key) {
                return Err(FacegateError::Storage(format!(
                    "Corpus directory '{}' has no display-name mapping",
                    key
                )));
            }
        }
        Ok(())
    }
}
