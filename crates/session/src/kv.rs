//! Named string values that outlive a session, such as provider keys.
//!
//! Nothing in the query or map path reads this store; the binary hands the
//! map token to the surface setup and that is all.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Corrupt(msg) => write!(f, "key-value store corrupt: {msg}"),
            StoreError::Io(msg) => write!(f, "key-value store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

pub trait KeyValueStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, name: &str, value: &str) -> Result<(), StoreError>;
    /// Returns `true` if a value was removed.
    fn remove(&mut self, name: &str) -> Result<bool, StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.entries.remove(name).is_some())
    }
}

/// JSON object on disk, rewritten in full on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => {
                serde_json::from_str(&text).map_err(|e| StoreError::Corrupt(e.to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };
        debug!(path = %path.display(), entries = entries.len(), "key-value store opened");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(name.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, name: &str) -> Result<bool, StoreError> {
        if self.entries.remove(name).is_none() {
            return Ok(false);
        }
        self.flush()?;
        Ok(true)
    }
}

pub const MAP_TOKEN: &str = "mapbox_token";
pub const WEATHER_KEY: &str = "openweather_key";

/// Optional provider credentials kept in a [`KeyValueStore`].
///
/// Blank values are treated as absent.
#[derive(Debug)]
pub struct ApiKeys<K> {
    store: K,
}

impl<K: KeyValueStore> ApiKeys<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    pub fn into_inner(self) -> K {
        self.store
    }

    pub fn map_token(&self) -> Result<Option<String>, StoreError> {
        self.read(MAP_TOKEN)
    }

    pub fn set_map_token(&mut self, token: &str) -> Result<(), StoreError> {
        self.write(MAP_TOKEN, token)
    }

    pub fn weather_key(&self) -> Result<Option<String>, StoreError> {
        self.read(WEATHER_KEY)
    }

    pub fn set_weather_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.write(WEATHER_KEY, key)
    }

    fn read(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .store
            .get(name)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    fn write(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        let value = value.trim();
        if value.is_empty() {
            self.store.remove(name)?;
            return Ok(());
        }
        self.store.set(name, value)
    }
}
