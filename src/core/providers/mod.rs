//! Provider Client: one prompt in, one plain-text completion out.
//!
//! The model id picks the backend through the static catalog. Credentials
//! are checked before anything touches the network and every call is a
//! single attempt.

mod anthropic;
mod gemini;
mod openai;

use crate::api::models::provider_for_model;
use crate::core::settings::{Settings, DEFAULT_MODEL};
use crate::core::tones::GENERIC_INSTRUCTION;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Keys shorter than this are rejected without a request.
pub const MIN_API_KEY_LEN: usize = 20;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Gemini, Provider::OpenAI, Provider::Anthropic];

    pub fn id(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|provider| provider.id().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("Unknown provider '{value}'"))
    }
}

/// Base URLs per backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    gemini: String,
    openai: String,
    anthropic: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            gemini: DEFAULT_GEMINI_BASE_URL.to_string(),
            openai: DEFAULT_OPENAI_BASE_URL.to_string(),
            anthropic: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
        }
    }
}

impl ProviderEndpoints {
    /// Every backend pointed at one base URL. Used with mock servers.
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            gemini: base_url.clone(),
            openai: base_url.clone(),
            anthropic: base_url,
        }
    }

    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::OpenAI => &self.openai,
            Provider::Anthropic => &self.anthropic,
        }
    }

    pub fn set(&mut self, provider: Provider, base_url: impl Into<String>) {
        let slot = match provider {
            Provider::Gemini => &mut self.gemini,
            Provider::OpenAI => &mut self.openai,
            Provider::Anthropic => &mut self.anthropic,
        };
        *slot = base_url.into();
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Invalid API key for {provider}. Please set a valid API key in settings.")]
    Credential { provider: Provider },

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: Provider },

    #[error("Could not read the {provider} response: {source}")]
    Decode {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
}

impl ProviderError {
    pub fn is_credential(&self) -> bool {
        matches!(self, ProviderError::Credential { .. })
    }
}

/// Anything that can turn a prompt into completion text.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        settings: &Settings,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    endpoints: ProviderEndpoints,
}

impl ProviderClient {
    pub fn new(endpoints: ProviderEndpoints, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, endpoints))
    }

    pub fn with_client(http: reqwest::Client, endpoints: ProviderEndpoints) -> Self {
        Self { http, endpoints }
    }

    pub fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }
}

#[async_trait]
impl Completer for ProviderClient {
    async fn complete(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        settings: &Settings,
    ) -> Result<String, ProviderError> {
        let model = resolve_model(settings);
        let provider = provider_for_model(model);
        let api_key = validate_credential(provider, settings.api_keys.for_provider(provider))?;
        let instruction = system_instruction
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(GENERIC_INSTRUCTION);
        let call = Call {
            http: &self.http,
            base_url: self.endpoints.base_url(provider),
            api_key,
            model,
            prompt,
            instruction,
        };

        debug!(provider = provider.id(), model, "Dispatching completion");
        match provider {
            Provider::Gemini => gemini::complete(call).await,
            Provider::OpenAI => openai::complete(call).await,
            Provider::Anthropic => anthropic::complete(call).await,
        }
    }
}

/// Everything a backend module needs for one request.
pub(crate) struct Call<'a> {
    pub http: &'a reqwest::Client,
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
    pub instruction: &'a str,
}

fn resolve_model(settings: &Settings) -> &str {
    let model = settings.model.trim();
    if model.is_empty() {
        DEFAULT_MODEL
    } else {
        model
    }
}

pub fn validate_credential(provider: Provider, api_key: &str) -> Result<&str, ProviderError> {
    let api_key = api_key.trim();
    if api_key.chars().count() < MIN_API_KEY_LEN {
        return Err(ProviderError::Credential { provider });
    }
    Ok(api_key)
}

/// Send a prepared request and decode a success body, mapping failures
/// onto `ProviderError`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: Provider,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .as_ref()
            .and_then(extract_error_summary)
            .filter(|summary| !summary.is_empty())
            .unwrap_or_else(|| generic_failure(status));
        warn!(provider = provider.id(), status = status.as_u16(), "Provider request failed");
        return Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| ProviderError::Decode { provider, source })
}

fn generic_failure(status: reqwest::StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("Request failed: {reason}"),
        None => "Request failed".to_string(),
    }
}

pub(crate) fn non_empty_text(provider: Provider, text: Option<&str>) -> Result<String, ProviderError> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
        .ok_or(ProviderError::EmptyResponse { provider })
}

/// Pull a human-readable message out of an API error body.
pub fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}
