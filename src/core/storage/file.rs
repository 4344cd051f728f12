use super::{announce, change_feed, StorageChange, StorageError, Store};
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;
use tempfile::NamedTempFile;
use tokio::sync::broadcast;

#[derive(Default)]
struct FileCacheState {
    values: Option<Map<String, Value>>,
    modified: Option<SystemTime>,
}

/// JSON-object file on disk. The whole object is rewritten atomically on
/// every write; reads are served from a cache that is dropped whenever the
/// file's mtime moves (another process wrote it).
pub struct FileStore {
    path: PathBuf,
    state: Mutex<FileCacheState>,
    feed: broadcast::Sender<StorageChange>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(FileCacheState::default()),
            feed: change_feed(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified_time(path: &Path) -> Option<SystemTime> {
        fs::metadata(path).ok()?.modified().ok()
    }

    fn load_from_disk(path: &Path) -> Result<Map<String, Value>, StorageError> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(path).map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&contents).map_err(|source| StorageError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn save_to_disk(path: &Path, values: &Map<String, Value>) -> Result<(), StorageError> {
        let parent = path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let contents = serde_json::to_string_pretty(values).map_err(StorageError::Encode)?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        temp_file.write_all(contents.as_bytes())?;
        temp_file.as_file_mut().sync_all()?;
        temp_file.persist(path)?;
        Ok(())
    }

    /// Reload the cache when the file changed underneath it.
    fn refresh<'a>(
        state: &'a mut FileCacheState,
        path: &Path,
    ) -> Result<&'a Map<String, Value>, StorageError> {
        let disk_modified = Self::modified_time(path);
        if state.values.is_none() || state.modified != disk_modified {
            state.values = Some(Self::load_from_disk(path)?);
            state.modified = disk_modified;
        }
        Ok(state.values.get_or_insert_with(Map::new))
    }

    /// Apply `f` to a copy of the current values and persist it. The cache
    /// only takes the new values once they are on disk.
    fn update(
        &self,
        f: impl FnOnce(&mut Map<String, Value>) -> Vec<StorageChange>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        let mut values = Self::refresh(&mut state, &self.path)?.clone();
        let changes = f(&mut values);
        if changes.is_empty() {
            return Ok(());
        }
        Self::save_to_disk(&self.path, &values)?;
        state.values = Some(values);
        state.modified = Self::modified_time(&self.path);
        drop(state);

        announce(&self.feed, changes);
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());
        Ok(Self::refresh(&mut state, &self.path)?.get(key).cloned())
    }

    fn set(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        self.update(|values| {
            let mut changes = Vec::new();
            for (key, value) in entries {
                if values.get(&key) != Some(&value) {
                    values.insert(key.clone(), value.clone());
                    changes.push(StorageChange {
                        key,
                        new_value: Some(value),
                    });
                }
            }
            changes
        })
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.update(|values| {
            keys.iter()
                .filter(|key| values.remove(**key).is_some())
                .map(|key| StorageChange {
                    key: key.to_string(),
                    new_value: None,
                })
                .collect()
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}
