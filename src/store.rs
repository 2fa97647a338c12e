use crate::filter::{FilterSpec, decode_filter_list};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Saved filter sets by name
pub type FilterSets = BTreeMap<String, Vec<FilterSpec>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Enter a name for the filter set")]
    EmptyName,
    #[error("No active filters to save")]
    EmptyFilterList,
    #[error("Filter set '{0}' not found")]
    NotFound(String),
    #[error("Failed to write filter sets to '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize filter sets: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Named filter sets persisted as one JSON object in a flat file
///
/// The file is read and rewritten whole on every operation; concurrent
/// writers are not coordinated and the last write wins.
#[derive(Debug, Clone)]
pub struct FilterSetStore {
    path: PathBuf,
}

impl FilterSetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every set that decodes; a missing or corrupt file is an empty store.
    pub fn load_all(&self) -> FilterSets {
        let mut sets = FilterSets::new();
        for (name, value) in self.read_raw() {
            match decode_filter_list(&value) {
                Ok(filters) => {
                    sets.insert(name, filters);
                }
                Err(e) => log::warn!(
                    "skipping filter set '{}' in '{}': {}",
                    name,
                    self.path.display(),
                    e
                ),
            }
        }
        sets
    }

    pub fn get(&self, name: &str) -> Option<Vec<FilterSpec>> {
        self.load_all().remove(name.trim())
    }

    pub fn names(&self) -> Vec<String> {
        self.load_all().into_keys().collect()
    }

    /// Create or overwrite the set `name`.
    pub fn save(&self, name: &str, filters: &[FilterSpec]) -> Result<(), StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if filters.is_empty() {
            return Err(StoreError::EmptyFilterList);
        }

        let mut raw = self.read_raw();
        raw.insert(name.to_string(), serde_json::to_value(filters)?);
        self.write_raw(&raw)?;
        log::info!("saved filter set '{}' ({} filters)", name, filters.len());
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<(), StoreError> {
        let name = name.trim();
        let mut raw = self.read_raw();
        if raw.remove(name).is_none() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        self.write_raw(&raw)?;
        log::info!("deleted filter set '{}'", name);
        Ok(())
    }

    /// Entries that no longer decode are kept here so saving another set
    /// does not drop them from the file.
    fn read_raw(&self) -> Map<String, Value> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Map::new(),
            Err(e) => {
                log::warn!("could not read '{}': {}", self.path.display(), e);
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                log::warn!(
                    "filter set file '{}' is corrupt or empty, treating it as empty",
                    self.path.display()
                );
                Map::new()
            }
        }
    }

    fn write_raw(&self, raw: &Map<String, Value>) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(raw)?;
        fs::write(&self.path, json).map_err(write_err)
    }
}
