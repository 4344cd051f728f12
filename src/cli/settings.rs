use std::error::Error;

use crate::core::settings::{
    ResponseFormat, Settings, SettingsPatch, DEFAULT_COMMAND_PREFIX, DEFAULT_MODEL,
    KEY_ANTHROPIC_API_KEY, KEY_AUTO_SEND, KEY_COMMAND_PREFIX, KEY_GEMINI_API_KEY, KEY_MODEL,
    KEY_OPENAI_API_KEY, KEY_RESPONSE_FORMAT,
};
use crate::core::storage::StorageAdapter;

/// Show only the last four characters of a stored key.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        len if len <= 4 => "****".to_string(),
        len => format!("****{}", chars[len - 4..].iter().collect::<String>()),
    }
}

pub fn format_settings(settings: &Settings) -> Vec<(&'static str, String)> {
    vec![
        (KEY_GEMINI_API_KEY, mask_key(&settings.api_keys.gemini_api_key)),
        (KEY_OPENAI_API_KEY, mask_key(&settings.api_keys.openai_api_key)),
        (
            KEY_ANTHROPIC_API_KEY,
            mask_key(&settings.api_keys.anthropic_api_key),
        ),
        (KEY_MODEL, settings.model.clone()),
        (KEY_COMMAND_PREFIX, settings.command_prefix.clone()),
        (
            KEY_RESPONSE_FORMAT,
            settings.response_format.as_str().to_string(),
        ),
        (KEY_AUTO_SEND, settings.auto_send.to_string()),
    ]
}

pub fn print_all(storage: &StorageAdapter) -> Result<(), Box<dyn Error>> {
    let settings = storage.load_settings()?;
    println!("⚙️  Settings");
    for (key, value) in format_settings(&settings) {
        println!("  {key:<18} {value}");
    }
    Ok(())
}

pub fn set(storage: &StorageAdapter, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let patch = SettingsPatch::from_key_value(key, value)?;
    storage.apply_settings_patch(&patch)?;
    println!("✅ Set {key}");
    Ok(())
}

fn default_value(key: &str) -> Result<&'static str, String> {
    match key {
        KEY_GEMINI_API_KEY | "gemini-api-key" | KEY_OPENAI_API_KEY | "openai-api-key"
        | KEY_ANTHROPIC_API_KEY | "anthropic-api-key" => Ok(""),
        KEY_MODEL => Ok(DEFAULT_MODEL),
        KEY_COMMAND_PREFIX | "command-prefix" => Ok(DEFAULT_COMMAND_PREFIX),
        KEY_RESPONSE_FORMAT | "response-format" => Ok(ResponseFormat::default().as_str()),
        KEY_AUTO_SEND | "auto-send" => Ok("false"),
        other => Err(format!("Unknown setting: {other}")),
    }
}

/// Patch that puts one setting back to its default.
pub fn unset_patch(key: &str) -> Result<SettingsPatch, String> {
    SettingsPatch::from_key_value(key, default_value(key)?)
}

pub fn unset(storage: &StorageAdapter, key: &str) -> Result<(), Box<dyn Error>> {
    storage.apply_settings_patch(&unset_patch(key)?)?;
    println!("✅ Unset {key}");
    Ok(())
}
