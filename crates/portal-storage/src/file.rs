//! File-backed storage, one JSON document per origin.
//!
//! The whole map is rewritten on every mutation through a temporary file and
//! a rename, so a reader never sees a half-written document.

use crate::{OriginStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persistent origin storage backed by a JSON file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create on first write) the store at `path`.
    ///
    /// A document that does not parse is moved aside to `<name>.json.corrupt`
    /// and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&content) {
                    Ok(data) => data,
                    Err(e) => {
                        let backup = path.with_extension("json.corrupt");
                        warn!(
                            path = %path.display(),
                            backup = %backup.display(),
                            error = %e,
                            "Origin store is unreadable, starting empty"
                        );
                        if let Err(e) = std::fs::rename(&path, &backup) {
                            warn!(error = %e, "Failed to move unreadable origin store aside");
                        }
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), keys = data.len(), "Opened origin store");

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> StorageResult<T> {
        let mut data = self.data.lock();
        let mut next = data.clone();
        let result = f(&mut next);
        self.persist(&next)?;
        *data = next;
        Ok(result)
    }
}

impl OriginStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|data| {
            data.insert(key.to_string(), value.to_string());
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        if !self.data.lock().contains_key(key) {
            return Ok(false);
        }
        self.mutate(|data| data.remove(key).is_some())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        self.mutate(|data| {
            for (key, value) in entries {
                data.insert(key.to_string(), value.to_string());
            }
        })
    }

    fn delete_many(&self, keys: &[&str]) -> StorageResult<()> {
        self.mutate(|data| {
            for key in keys {
                data.remove(*key);
            }
        })
    }
}
