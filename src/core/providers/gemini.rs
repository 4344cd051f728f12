use super::{non_empty_text, send_json, Call, Provider, ProviderError};
use crate::api::{GeminiContent, GeminiPart, GenerateContentRequest, GenerateContentResponse, ROLE_USER};
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

fn text_content(role: Option<&str>, text: &str) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_owned),
        parts: vec![GeminiPart {
            text: text.to_string(),
        }],
    }
}

pub(super) async fn complete(call: Call<'_>) -> Result<String, ProviderError> {
    let body = GenerateContentRequest {
        system_instruction: text_content(None, call.instruction),
        contents: vec![text_content(Some(ROLE_USER), call.prompt)],
    };
    let endpoint = format!("models/{}:generateContent", call.model);
    let request = call
        .http
        .post(construct_api_url(call.base_url, &endpoint))
        .header("Content-Type", "application/json");
    let request = add_auth_headers(request, Provider::Gemini, call.api_key).json(&body);

    let response: GenerateContentResponse = send_json(Provider::Gemini, request).await?;
    non_empty_text(Provider::Gemini, response.first_text())
}
