use super::{announce, change_feed, StorageChange, StorageError, Store};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// In-process store. Used by tests and as the page-side cache when no
/// backing file is configured.
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
    feed: broadcast::Sender<StorageChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            feed: change_feed(),
        }
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let values = self.values.lock().unwrap_or_else(|err| err.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        let mut changes = Vec::new();
        {
            let mut values = self.values.lock().unwrap_or_else(|err| err.into_inner());
            for (key, value) in entries {
                if values.get(&key) != Some(&value) {
                    values.insert(key.clone(), value.clone());
                    changes.push(StorageChange {
                        key,
                        new_value: Some(value),
                    });
                }
            }
        }
        announce(&self.feed, changes);
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut changes = Vec::new();
        {
            let mut values = self.values.lock().unwrap_or_else(|err| err.into_inner());
            for key in keys {
                if values.remove(*key).is_some() {
                    changes.push(StorageChange {
                        key: key.to_string(),
                        new_value: None,
                    });
                }
            }
        }
        announce(&self.feed, changes);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.feed.subscribe()
    }
}
