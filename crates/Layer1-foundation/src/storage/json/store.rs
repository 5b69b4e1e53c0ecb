//! JSON settings files
//!
//! Settings live in up to two directories, read in order so that later
//! files override earlier ones:
//!
//! 1. global  `<config_dir>/trail/`
//! 2. project `./.trail/`

use crate::{Error, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_DIR: &str = "trail";
const PROJECT_DIR: &str = ".trail";

/// Directory of JSON settings files
#[derive(Debug, Clone)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn global() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Cannot find config directory".to_string()))?;
        Ok(Self::new(dir.join(APP_DIR)))
    }

    pub fn project(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into().join(PROJECT_DIR))
    }

    pub fn current_project() -> Result<Self> {
        Ok(Self::project(std::env::current_dir()?))
    }

    /// Global then project store; a directory that cannot be resolved is left out
    pub fn layered() -> Vec<Self> {
        [Self::global(), Self::current_project()]
            .into_iter()
            .filter_map(|store| match store {
                Ok(store) => Some(store),
                Err(e) => {
                    debug!(error = %e, "Settings directory unavailable");
                    None
                }
            })
            .collect()
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.base_dir.join(filename)
    }

    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        let content = std::fs::read_to_string(self.file_path(filename))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// `Ok(None)` when the file does not exist; a malformed file still fails
    pub fn load_optional<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        if !self.file_path(filename).exists() {
            return Ok(None);
        }
        self.load(filename).map(Some)
    }

    /// Never fails; an unreadable file is logged and replaced by `T::default()`
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, filename: &str) -> T {
        match self.load_optional(filename) {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(path = %self.file_path(filename).display(), error = %e, "Ignoring settings file");
                T::default()
            }
        }
    }

    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        let content = serde_json::to_string_pretty(data)?;
        std::fs::write(self.file_path(filename), content)?;
        debug!(path = %self.file_path(filename).display(), "Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::project(dir.path());

        let missing: Option<BTreeMap<String, i32>> = store.load_optional("a.json").unwrap();
        assert!(missing.is_none());

        let data = BTreeMap::from([("offset".to_string(), 60)]);
        store.save("a.json", &data).unwrap();

        let loaded: BTreeMap<String, i32> = store.load("a.json").unwrap();
        assert_eq!(loaded, data);
        assert!(store.base_dir().ends_with(".trail"));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        std::fs::write(store.file_path("bad.json"), "{ not json").unwrap();

        let result: Result<Option<BTreeMap<String, i32>>> = store.load_optional("bad.json");
        assert!(matches!(result, Err(Error::Json(_))));

        let fallback: BTreeMap<String, i32> = store.load_or_default("bad.json");
        assert!(fallback.is_empty());
    }

    #[test]
    fn test_layered_ends_with_current_project() {
        let stores = JsonStore::layered();
        let project = stores.last().unwrap();
        assert_eq!(
            project.base_dir(),
            std::env::current_dir().unwrap().join(PROJECT_DIR)
        );
        if let Some(config_dir) = dirs::config_dir() {
            assert_eq!(stores.len(), 2);
            assert_eq!(stores[0].base_dir(), config_dir.join(APP_DIR));
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let result: Result<BTreeMap<String, i32>> = store.load("absent.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
