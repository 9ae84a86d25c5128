//! Feature store collaborators
//!
//! Prepared node sets and every phase result are persisted by name. The
//! simulation only needs persist/load/exists/delete, so a directory of JSON
//! files and a plain in-memory map both qualify.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::StoreError;
use crate::nodes::{SourceUnit, TargetUnit};

/// A persisted collection of units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "units", rename_all = "snake_case")]
pub enum FeatureSet {
    Sources(Vec<SourceUnit>),
    Targets(Vec<TargetUnit>),
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        match self {
            FeatureSet::Sources(units) => units.len(),
            FeatureSet::Targets(units) => units.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_targets(self) -> Option<Vec<TargetUnit>> {
        match self {
            FeatureSet::Targets(units) => Some(units),
            FeatureSet::Sources(_) => None,
        }
    }

    pub fn into_sources(self) -> Option<Vec<SourceUnit>> {
        match self {
            FeatureSet::Sources(units) => Some(units),
            FeatureSet::Targets(_) => None,
        }
    }
}

pub trait FeatureStore {
    fn persist(&mut self, set: &FeatureSet, name: &str) -> Result<(), StoreError>;
    fn load(&self, name: &str) -> Result<FeatureSet, StoreError>;
    fn exists(&self, name: &str) -> bool;
    fn delete(&mut self, name: &str) -> Result<(), StoreError>;

    /// Persist with overwrite semantics: any existing set is removed first
    fn replace(&mut self, set: &FeatureSet, name: &str) -> Result<(), StoreError> {
        if self.exists(name) {
            self.delete(name)?;
        }
        self.persist(set, name)
    }
}

/// Keeps feature sets in memory for the lifetime of the run
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: BTreeMap<String, FeatureSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}

impl FeatureStore for MemoryStore {
    fn persist(&mut self, set: &FeatureSet, name: &str) -> Result<(), StoreError> {
        self.sets.insert(name.to_string(), set.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<FeatureSet, StoreError> {
        self.sets
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.sets.contains_key(name)
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        self.sets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}

/// One pretty-printed JSON file per feature set
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", name))
    }
}

impl FeatureStore for JsonDirStore {
    fn persist(&mut self, set: &FeatureSet, name: &str) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(set)?;
        std::fs::write(self.path_for(name), json)?;
        tracing::debug!(name, units = set.len(), "Persisted feature set");
        Ok(())
    }

    fn load(&self, name: &str) -> Result<FeatureSet, StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    fn delete(&mut self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EvolvedCategory, LandCode, UnitId};
    use geo_types::Point;

    fn sources() -> FeatureSet {
        FeatureSet::Sources(vec![SourceUnit {
            id: UnitId(1),
            origin_code: LandCode::from("211"),
            category: EvolvedCategory::FoodCrop,
            compression_factor: 50,
            location: Point::new(1.0, 2.0),
        }])
    }

    #[test]
    fn test_memory_store_lifecycle() {
        let mut store = MemoryStore::new();
        assert!(!store.exists("a"));
        store.persist(&sources(), "a").unwrap();
        assert!(store.exists("a"));
        assert_eq!(store.load("a").unwrap(), sources());
        store.delete("a").unwrap();
        assert!(matches!(store.load("a"), Err(StoreError::NotFound(_))));
        assert!(store.delete("a").is_err());
    }

    #[test]
    fn test_replace_overwrites() {
        let mut store = MemoryStore::new();
        store.persist(&FeatureSet::Targets(vec![]), "phase").unwrap();
        store.replace(&sources(), "phase").unwrap();
        assert_eq!(store.load("phase").unwrap().len(), 1);
        assert_eq!(store.names().count(), 1);
    }

    #[test]
    fn test_json_dir_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("gac-store-test-{}", std::process::id()));
        let mut store = JsonDirStore::open(&dir).unwrap();
        store.replace(&sources(), "source_nodes").unwrap();
        assert!(store.exists("source_nodes"));

        let loaded = store.load("source_nodes").unwrap();
        assert_eq!(loaded.into_sources().unwrap().len(), 1);

        store.delete("source_nodes").unwrap();
        assert!(!store.exists("source_nodes"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
