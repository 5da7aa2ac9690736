//! File-backed key-value store
//!
//! Each key lives in `<data_dir>/<key>.json`. Writes go to a temporary file
//! that is then renamed over the target, so a crash never leaves half a value
//! behind. The quota counts key and value bytes across every key, matching
//! how the in-memory store accounts for space.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use domain_metering::{KeyValueStore, StoreError};

use crate::error::StorageError;

const EXTENSION: &str = "json";

/// Local key-value store over a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: usize,
}

impl FileStore {
    /// Opens (creating if needed) the data directory
    pub fn open(dir: impl Into<PathBuf>, quota: usize) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        debug!(dir = %dir.display(), quota, "File store opened");
        Ok(Self { dir, quota })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    /// Total bytes used by every key except `exclude`
    pub fn used_bytes(&self, exclude: Option<&str>) -> Result<usize, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;

        let mut used = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if Some(key) == exclude {
                continue;
            }
            let len = entry.metadata().map_err(|e| StorageError::io(&path, e))?.len();
            used += key.len() + len as usize;
        }
        Ok(used)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.{}", key, EXTENSION)))
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => {
                debug!(key, bytes = value.len(), "Loaded key");
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        let needed = self.used_bytes(Some(key))? + key.len() + value.len();
        if needed > self.quota {
            warn!(key, needed, limit = self.quota, "Store quota exceeded");
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed,
                limit: self.quota,
            });
        }

        let tmp = path.with_extension(format!("{}.tmp", EXTENSION));
        fs::write(&tmp, value).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))?;
        debug!(key, bytes = value.len(), "Saved key");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Removed key");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read(key)?)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(self.write(key, value)?)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        Ok(self.delete(key)?)
    }
}
