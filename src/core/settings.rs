//! User settings shared by every context.
//!
//! Settings are stored as flat keys in the key-value store (one key per
//! field) so a partial update only touches the fields it names.

use crate::core::providers::Provider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_COMMAND_PREFIX: &str = "prompt:";
/// Always recognised in addition to the configured prefix.
pub const ALTERNATE_PREFIX: &str = "gpt:";

pub const KEY_GEMINI_API_KEY: &str = "geminiApiKey";
pub const KEY_OPENAI_API_KEY: &str = "openaiApiKey";
pub const KEY_ANTHROPIC_API_KEY: &str = "anthropicApiKey";
pub const KEY_MODEL: &str = "model";
pub const KEY_COMMAND_PREFIX: &str = "commandPrefix";
pub const KEY_RESPONSE_FORMAT: &str = "responseFormat";
pub const KEY_AUTO_SEND: &str = "autoSend";

pub const SETTINGS_KEYS: &[&str] = &[
    KEY_GEMINI_API_KEY,
    KEY_OPENAI_API_KEY,
    KEY_ANTHROPIC_API_KEY,
    KEY_MODEL,
    KEY_COMMAND_PREFIX,
    KEY_RESPONSE_FORMAT,
    KEY_AUTO_SEND,
];

/// What ends up in the chat field after a successful generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Replace the field with the response only.
    #[default]
    Edit,
    /// Original input followed by the response, in one message.
    Both,
    /// Send the original input, then send the response as a second message.
    Separate,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseFormat::Edit => "edit",
            ResponseFormat::Both => "both",
            ResponseFormat::Separate => "separate",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(ResponseFormat::Edit),
            "both" => Ok(ResponseFormat::Both),
            "separate" => Ok(ResponseFormat::Separate),
            other => Err(format!(
                "Unknown response format '{other}'. Expected one of: edit, both, separate"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeys {
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub anthropic_api_key: String,
}

impl ApiKeys {
    pub fn for_provider(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gemini => &self.gemini_api_key,
            Provider::OpenAI => &self.openai_api_key,
            Provider::Anthropic => &self.anthropic_api_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(flatten)]
    pub api_keys: ApiKeys,
    pub model: String,
    pub command_prefix: String,
    pub response_format: ResponseFormat,
    /// Submit the message after `edit`/`both` replacement instead of leaving
    /// it in the field for review.
    #[serde(default)]
    pub auto_send: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            model: DEFAULT_MODEL.to_string(),
            command_prefix: DEFAULT_COMMAND_PREFIX.to_string(),
            response_format: ResponseFormat::default(),
            auto_send: false,
        }
    }
}

impl Settings {
    /// The configured prefix, or the default when it was saved blank.
    pub fn effective_prefix(&self) -> &str {
        let trimmed = self.command_prefix.trim();
        if trimmed.is_empty() {
            DEFAULT_COMMAND_PREFIX
        } else {
            trimmed
        }
    }

    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(key) = &patch.gemini_api_key {
            self.api_keys.gemini_api_key = key.clone();
        }
        if let Some(key) = &patch.openai_api_key {
            self.api_keys.openai_api_key = key.clone();
        }
        if let Some(key) = &patch.anthropic_api_key {
            self.api_keys.anthropic_api_key = key.clone();
        }
        if let Some(model) = &patch.model {
            self.model = model.clone();
        }
        if let Some(prefix) = &patch.command_prefix {
            self.command_prefix = prefix.clone();
        }
        if let Some(format) = patch.response_format {
            self.response_format = format;
        }
        if let Some(auto_send) = patch.auto_send {
            self.auto_send = auto_send;
        }
    }
}

/// Partial settings update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_send: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }

    /// A patch that restores every field to its default.
    pub fn reset() -> Self {
        let defaults = Settings::default();
        Self {
            gemini_api_key: Some(String::new()),
            openai_api_key: Some(String::new()),
            anthropic_api_key: Some(String::new()),
            model: Some(defaults.model),
            command_prefix: Some(defaults.command_prefix),
            response_format: Some(defaults.response_format),
            auto_send: Some(defaults.auto_send),
        }
    }

    /// Build a single-field patch from a storage key and textual value, as
    /// used by `promptline set`.
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, String> {
        let mut patch = SettingsPatch::default();
        let value = value.trim();
        match key {
            KEY_GEMINI_API_KEY | "gemini-api-key" => patch.gemini_api_key = Some(value.to_string()),
            KEY_OPENAI_API_KEY | "openai-api-key" => patch.openai_api_key = Some(value.to_string()),
            KEY_ANTHROPIC_API_KEY | "anthropic-api-key" => {
                patch.anthropic_api_key = Some(value.to_string())
            }
            KEY_MODEL => patch.model = Some(value.to_string()),
            KEY_COMMAND_PREFIX | "command-prefix" => patch.command_prefix = Some(value.to_string()),
            KEY_RESPONSE_FORMAT | "response-format" => {
                patch.response_format = Some(value.parse()?)
            }
            KEY_AUTO_SEND | "auto-send" => {
                let flag = match value.to_ascii_lowercase().as_str() {
                    "true" | "on" | "yes" | "1" => true,
                    "false" | "off" | "no" | "0" => false,
                    other => return Err(format!("Expected true or false, got '{other}'")),
                };
                patch.auto_send = Some(flag);
            }
            other => return Err(format!("Unknown setting: {other}")),
        }
        Ok(patch)
    }
}
