//! Key-value persistence for user preferences.
//!
//! Preferences are loaded once when a view starts and written through on
//! every change. The store is injected, so tests run against [`MemoryStore`]
//! and the CLI against [`JsonFileStore`].

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use thiserror::Error;
use tracing::debug;

/// Key for the reviewer's name
pub const VALIDATOR_NAME_KEY: &str = "validator_name";
/// Key for the UI locale
pub const LOCALE_KEY: &str = "locale";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Preference file IO failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference file is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Preference store lock poisoned")]
    Poisoned,
}

/// Swappable key-value store
pub trait PreferenceStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    fn save(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock().map_err(|_| PreferenceError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object file, locked for every access
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(file: &mut File) -> Result<BTreeMap<String, String>, PreferenceError> {
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl PreferenceStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&self.path)?;
        file.lock_shared()?;
        let map = Self::read_map(&mut file)?;
        // Lock is released when file is dropped
        Ok(map.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut map = Self::read_map(&mut file)?;
        map.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&map)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(json.as_bytes())?;
        file.flush()?;

        debug!(key, path = %self.path.display(), "Saved preference");
        Ok(())
    }
}

/// Loaded preferences with write-through setters
#[derive(Debug)]
pub struct Preferences<S> {
    store: S,
    validator_name: Option<String>,
    locale: Option<String>,
}

impl<S: PreferenceStore> Preferences<S> {
    /// Read all known keys from the store
    pub fn load(store: S) -> Result<Self, PreferenceError> {
        let validator_name = store.load(VALIDATOR_NAME_KEY)?.filter(|v| !v.is_empty());
        let locale = store.load(LOCALE_KEY)?.filter(|v| !v.is_empty());
        Ok(Self {
            store,
            validator_name,
            locale,
        })
    }

    pub fn validator_name(&self) -> Option<&str> {
        self.validator_name.as_deref()
    }

    pub fn set_validator_name(&mut self, name: &str) -> Result<(), PreferenceError> {
        let name = name.trim();
        if self.validator_name.as_deref() == Some(name) {
            return Ok(());
        }
        self.store.save(VALIDATOR_NAME_KEY, name)?;
        self.validator_name = Some(name.to_string()).filter(|v| !v.is_empty());
        Ok(())
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn set_locale(&mut self, locale: &str) -> Result<(), PreferenceError> {
        self.store.save(LOCALE_KEY, locale)?;
        self.locale = Some(locale.to_string()).filter(|v| !v.is_empty());
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.load("k").unwrap(), None);
        store.save("k", "v").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_json_store_keeps_other_keys() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path().join("nested").join("preferences.json"));

        assert_eq!(store.load(VALIDATOR_NAME_KEY).unwrap(), None);
        store.save(VALIDATOR_NAME_KEY, "Dr. Novak").unwrap();
        store.save(LOCALE_KEY, "cs").unwrap();
        store.save(VALIDATOR_NAME_KEY, "Dr. Svoboda").unwrap();

        assert_eq!(store.load(VALIDATOR_NAME_KEY).unwrap().as_deref(), Some("Dr. Svoboda"));
        assert_eq!(store.load(LOCALE_KEY).unwrap().as_deref(), Some("cs"));
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("preferences.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonFileStore::new(path);
        assert!(matches!(
            store.load(LOCALE_KEY),
            Err(PreferenceError::Serialization(_))
        ));
    }

    #[test]
    fn test_preferences_write_through() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("preferences.json");

        let mut prefs = Preferences::load(JsonFileStore::new(&path)).unwrap();
        assert!(prefs.validator_name().is_none());
        prefs.set_validator_name("  Dr. Novak ").unwrap();

        let reloaded = Preferences::load(JsonFileStore::new(&path)).unwrap();
        assert_eq!(reloaded.validator_name(), Some("Dr. Novak"));
    }
}
