//! Small persisted key-value store for client-local UI state.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const STORAGE_FILENAME: &str = "local_storage.json";

/// String-to-string storage that survives across sessions.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);
}

/// Storage persisted as a flat JSON object on disk.
///
/// Reads are served from memory; every write rewrites the file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Open the storage file at the default location.
    pub fn load() -> Self {
        Self::open(Self::default_path())
    }

    /// Open (or start) a storage file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        log::debug!("Loading local storage from {:?}", path);

        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    log::error!("Failed to parse local storage {:?}: {:?}", path, e);
                    BTreeMap::new()
                }
            },
            Err(_) => {
                log::debug!("No local storage found, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn save(&self, entries: &BTreeMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create storage directory: {:?}", e);
                return;
            }
        }

        match serde_json::to_string_pretty(entries) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    log::error!("Failed to write local storage: {:?}", e);
                }
            }
            Err(e) => log::error!("Failed to serialize local storage: {:?}", e),
        }
    }

    /// `<data dir>/docuery/local_storage.json`, or `~/.docuery/` when the
    /// platform has no data dir.
    pub fn default_path() -> PathBuf {
        if let Some(data) = dirs::data_dir() {
            data.join("docuery").join(STORAGE_FILENAME)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".docuery").join(STORAGE_FILENAME)
        } else {
            PathBuf::from(".docuery").join(STORAGE_FILENAME)
        }
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            log::error!("Local storage lock poisoned, dropping write to {}", key);
            return;
        };
        if entries.get(key).map(String::as_str) == Some(value) {
            return;
        }
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries);
    }
}

/// Non-persistent storage, shareable between handles.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage(Arc<Mutex<HashMap<String, String>>>);

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage.set(key, value);
        storage
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.0.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.0.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }
}
