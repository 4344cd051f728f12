use crate::core::providers::{Provider, ProviderEndpoints};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Base URL overrides, mostly for proxies and local test servers.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    pub gemini: Option<String>,
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

/// Operator configuration read from `config.toml`.
///
/// User-facing settings (keys, model, prefix, response format) are not
/// here; they live in the key-value store so every context sees them.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Location of the key-value storage file
    pub storage_path: Option<PathBuf>,
    #[serde(default)]
    pub endpoints: EndpointOverrides,
    /// Per-request timeout for provider calls
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn endpoints(&self) -> ProviderEndpoints {
        let mut endpoints = ProviderEndpoints::default();
        let overrides = [
            (Provider::Gemini, &self.endpoints.gemini),
            (Provider::OpenAI, &self.endpoints.openai),
            (Provider::Anthropic, &self.endpoints.anthropic),
        ];
        for (provider, value) in overrides {
            if let Some(url) = value.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
                endpoints.set(provider, url);
            }
        }
        endpoints
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Storage file to use: explicit override, then config, then the
    /// platform data directory.
    pub fn resolve_storage_path(&self, override_path: Option<&Path>) -> PathBuf {
        override_path
            .map(Path::to_path_buf)
            .or_else(|| self.storage_path.clone())
            .unwrap_or_else(Config::default_storage_path)
    }
}
