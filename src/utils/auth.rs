//! Provider-specific credential headers.

use crate::core::providers::Provider;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Attach the credential header each backend expects.
///
/// - Anthropic: `x-api-key` plus `anthropic-version`
/// - Gemini: `x-goog-api-key`
/// - OpenAI: `Authorization: Bearer`
pub fn add_auth_headers(
    request: reqwest::RequestBuilder,
    provider: Provider,
    api_key: &str,
) -> reqwest::RequestBuilder {
    match provider {
        Provider::Anthropic => request
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION),
        Provider::Gemini => request.header("x-goog-api-key", api_key),
        Provider::OpenAI => request.header("Authorization", format!("Bearer {api_key}")),
    }
}
