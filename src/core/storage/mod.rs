//! Key-value persistence shared by every context.
//!
//! A [`Store`] holds flat JSON values under string keys and announces every
//! write on a broadcast channel. Writes are last-writer-wins; the change
//! feed is the only cross-context invalidation signal, so anything that
//! caches a stored value subscribes and re-reads on change.

mod adapter;
mod file;
mod memory;

pub use adapter::StorageAdapter;
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::core::templates::TemplateError;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::broadcast;

pub const KEY_CUSTOM_TONES: &str = "customTones";
pub const KEY_SELECTED_PRESET_ID: &str = "selectedPresetId";
pub const KEY_PROMPT_HISTORY: &str = "promptHistory";
pub const KEY_TEMPLATES: &str = "templates";
pub const KEY_ONBOARDING_SHOWN: &str = "onboardingShown";

const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    /// `None` when the key was removed.
    pub new_value: Option<Value>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read storage at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse storage at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write storage: {0}")]
    Write(#[from] std::io::Error),
    #[error("Failed to persist storage: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Stored value for '{key}' has an unexpected shape: {source}")]
    Shape {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Write several keys at once. Subscribers see one change per key whose
    /// value actually changed.
    fn set(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError>;

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

pub(crate) fn change_feed() -> broadcast::Sender<StorageChange> {
    broadcast::channel(CHANGE_FEED_CAPACITY).0
}

pub(crate) fn announce(feed: &broadcast::Sender<StorageChange>, changes: Vec<StorageChange>) {
    for change in changes {
        // No subscribers is not an error.
        let _ = feed.send(change);
    }
}
