use super::{
    StorageChange, StorageError, Store, KEY_CUSTOM_TONES, KEY_ONBOARDING_SHOWN,
    KEY_PROMPT_HISTORY, KEY_SELECTED_PRESET_ID, KEY_TEMPLATES,
};
use crate::core::history::{push_entry, HistoryEntry};
use crate::core::settings::{
    ApiKeys, ResponseFormat, Settings, SettingsPatch, DEFAULT_COMMAND_PREFIX, DEFAULT_MODEL,
    KEY_ANTHROPIC_API_KEY, KEY_AUTO_SEND, KEY_COMMAND_PREFIX, KEY_GEMINI_API_KEY, KEY_MODEL,
    KEY_OPENAI_API_KEY, KEY_RESPONSE_FORMAT,
};
use crate::core::templates::{self, Template};
use crate::core::tones::TonePreset;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Typed view over a [`Store`]. Cheap to clone; every context holds one.
#[derive(Clone)]
pub struct StorageAdapter {
    store: Arc<dyn Store>,
}

impl StorageAdapter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.store.subscribe()
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| StorageError::Shape {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value).map_err(StorageError::Encode)?;
        self.store.set(vec![(key.to_string(), value)])
    }

    fn read_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .read::<String>(key)?
            .filter(|value| !value.trim().is_empty()))
    }

    /// Settings with defaults filled in for anything missing or blank.
    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let response_format = self
            .read_string(KEY_RESPONSE_FORMAT)?
            .and_then(|raw| raw.parse::<ResponseFormat>().ok())
            .unwrap_or_default();

        Ok(Settings {
            api_keys: ApiKeys {
                gemini_api_key: self.read_string(KEY_GEMINI_API_KEY)?.unwrap_or_default(),
                openai_api_key: self.read_string(KEY_OPENAI_API_KEY)?.unwrap_or_default(),
                anthropic_api_key: self
                    .read_string(KEY_ANTHROPIC_API_KEY)?
                    .unwrap_or_default(),
            },
            model: self
                .read_string(KEY_MODEL)?
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            command_prefix: self
                .read_string(KEY_COMMAND_PREFIX)?
                .unwrap_or_else(|| DEFAULT_COMMAND_PREFIX.to_string()),
            response_format,
            auto_send: self.read::<bool>(KEY_AUTO_SEND)?.unwrap_or(false),
        })
    }

    /// Persist only the fields present in `patch`.
    pub fn apply_settings_patch(&self, patch: &SettingsPatch) -> Result<(), StorageError> {
        let mut entries: Vec<(String, Value)> = Vec::new();
        let mut push = |key: &str, value: Value| entries.push((key.to_string(), value));

        if let Some(key) = &patch.gemini_api_key {
            push(KEY_GEMINI_API_KEY, Value::from(key.clone()));
        }
        if let Some(key) = &patch.openai_api_key {
            push(KEY_OPENAI_API_KEY, Value::from(key.clone()));
        }
        if let Some(key) = &patch.anthropic_api_key {
            push(KEY_ANTHROPIC_API_KEY, Value::from(key.clone()));
        }
        if let Some(model) = &patch.model {
            push(KEY_MODEL, Value::from(model.clone()));
        }
        if let Some(prefix) = &patch.command_prefix {
            push(KEY_COMMAND_PREFIX, Value::from(prefix.clone()));
        }
        if let Some(format) = patch.response_format {
            push(KEY_RESPONSE_FORMAT, Value::from(format.as_str()));
        }
        if let Some(auto_send) = patch.auto_send {
            push(KEY_AUTO_SEND, Value::from(auto_send));
        }

        if entries.is_empty() {
            return Ok(());
        }
        self.store.set(entries)
    }

    pub fn custom_tones(&self) -> Result<Vec<TonePreset>, StorageError> {
        Ok(self.read(KEY_CUSTOM_TONES)?.unwrap_or_default())
    }

    /// Add or replace a user tone by id.
    pub fn save_custom_tone(&self, tone: TonePreset) -> Result<(), StorageError> {
        let mut tones = self.custom_tones()?;
        match tones.iter_mut().find(|existing| existing.id == tone.id) {
            Some(existing) => *existing = tone,
            None => tones.push(tone),
        }
        self.write(KEY_CUSTOM_TONES, &tones)
    }

    pub fn delete_custom_tone(&self, id: &str) -> Result<bool, StorageError> {
        let mut tones = self.custom_tones()?;
        let before = tones.len();
        tones.retain(|tone| tone.id != id);
        if tones.len() == before {
            return Ok(false);
        }
        self.write(KEY_CUSTOM_TONES, &tones)?;
        Ok(true)
    }

    pub fn selected_preset_id(&self) -> Result<Option<String>, StorageError> {
        self.read_string(KEY_SELECTED_PRESET_ID)
    }

    pub fn set_selected_preset_id(&self, id: &str) -> Result<(), StorageError> {
        self.write(KEY_SELECTED_PRESET_ID, &id)
    }

    pub fn history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        Ok(self.read(KEY_PROMPT_HISTORY)?.unwrap_or_default())
    }

    pub fn append_history(&self, entry: HistoryEntry) -> Result<(), StorageError> {
        let mut history = self.history()?;
        debug!(id = %entry.id, tone = %entry.tone, "Appending history entry");
        push_entry(&mut history, entry);
        self.write(KEY_PROMPT_HISTORY, &history)
    }

    pub fn clear_history(&self) -> Result<(), StorageError> {
        self.write(KEY_PROMPT_HISTORY, &Vec::<HistoryEntry>::new())
    }

    pub fn templates(&self) -> Result<Vec<Template>, StorageError> {
        Ok(self.read(KEY_TEMPLATES)?.unwrap_or_default())
    }

    pub fn add_template(
        &self,
        title: &str,
        content: &str,
        now_ms: i64,
    ) -> Result<Template, StorageError> {
        let mut list = self.templates()?;
        let template = templates::add_template(&mut list, title, content, now_ms)?;
        self.write(KEY_TEMPLATES, &list)?;
        Ok(template)
    }

    pub fn update_template(
        &self,
        id: &str,
        title: &str,
        content: &str,
    ) -> Result<(), StorageError> {
        let mut list = self.templates()?;
        templates::update_template(&mut list, id, title, content)?;
        self.write(KEY_TEMPLATES, &list)
    }

    pub fn delete_template(&self, id: &str) -> Result<(), StorageError> {
        let mut list = self.templates()?;
        templates::delete_template(&mut list, id)?;
        self.write(KEY_TEMPLATES, &list)
    }

    pub fn onboarding_shown(&self) -> Result<bool, StorageError> {
        Ok(self.read::<bool>(KEY_ONBOARDING_SHOWN)?.unwrap_or(false))
    }

    pub fn mark_onboarding_shown(&self) -> Result<(), StorageError> {
        self.write(KEY_ONBOARDING_SHOWN, &true)
    }
}
