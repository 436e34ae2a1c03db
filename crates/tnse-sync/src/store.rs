//! Persisted config entry storage.
//!
//! The host owns the real persistence format; this crate only needs to
//! read the entry and write credential patches back.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tnse_core::ConfigEntry;
use tracing::{debug, info};

use crate::error::StoreError;

/// Storage for a single config entry.
pub trait ConfigStore: Send + Sync {
    /// Returns a copy of the current entry.
    fn load(&self) -> Result<ConfigEntry, StoreError>;

    /// Merges `patch` into the entry data, preserving keys it does not mention.
    fn update_data(&self, patch: Map<String, Value>) -> Result<(), StoreError>;

    /// Replaces the entry data after re-authentication.
    fn replace_data(&self, data: Map<String, Value>) -> Result<(), StoreError>;
}

/// In-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    entry: RwLock<ConfigEntry>,
}

impl MemoryStore {
    /// Creates a store holding `entry`, migrated to the current schema.
    pub fn new(mut entry: ConfigEntry) -> Result<Self, StoreError> {
        entry.migrate()?;
        Ok(Self {
            entry: RwLock::new(entry),
        })
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<ConfigEntry, StoreError> {
        Ok(self.entry.read().clone())
    }

    fn update_data(&self, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.entry.write().merge_data(patch);
        Ok(())
    }

    fn replace_data(&self, data: Map<String, Value>) -> Result<(), StoreError> {
        self.entry.write().replace_data(data);
        Ok(())
    }
}

/// Store backed by a pretty-printed JSON file.
///
/// Writes go to a sibling temporary file which is then renamed into
/// place. Readers never observe a half-written entry.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entry: Mutex<ConfigEntry>,
}

impl JsonFileStore {
    /// Opens the entry at `path`, migrating and re-saving it when needed.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, is not a valid entry, or was
    /// written by a newer schema.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let raw = fs::read_to_string(&path)?;
        let mut entry: ConfigEntry = serde_json::from_str(&raw)?;

        let outcome = entry.migrate()?;
        if outcome.changed {
            info!(
                "Migrated config entry {} to version {}.{}",
                path.display(),
                entry.version,
                entry.minor_version
            );
            write_entry(&path, &entry)?;
        }

        Ok(Self {
            path,
            entry: Mutex::new(entry),
        })
    }

    /// Creates a new entry file, overwriting any existing one.
    pub fn create(path: impl Into<PathBuf>, entry: ConfigEntry) -> Result<Self, StoreError> {
        let path = path.into();
        write_entry(&path, &entry)?;
        Ok(Self {
            path,
            entry: Mutex::new(entry),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<ConfigEntry, StoreError> {
        Ok(self.entry.lock().clone())
    }

    fn update_data(&self, patch: Map<String, Value>) -> Result<(), StoreError> {
        let mut entry = self.entry.lock();
        let mut updated = entry.clone();
        updated.merge_data(patch);
        write_entry(&self.path, &updated)?;
        *entry = updated;
        Ok(())
    }

    fn replace_data(&self, data: Map<String, Value>) -> Result<(), StoreError> {
        let mut entry = self.entry.lock();
        let mut updated = entry.clone();
        updated.replace_data(data);
        write_entry(&self.path, &updated)?;
        *entry = updated;
        Ok(())
    }
}

fn write_entry(path: &Path, entry: &ConfigEntry) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(entry)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    debug!("Saved config entry to {}", path.display());
    Ok(())
}
