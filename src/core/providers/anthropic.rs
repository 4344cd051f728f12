use super::{non_empty_text, send_json, Call, Provider, ProviderError};
use crate::api::{ChatMessage, MessagesRequest, MessagesResponse};
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

pub const MAX_TOKENS: u32 = 1024;

pub(super) async fn complete(call: Call<'_>) -> Result<String, ProviderError> {
    let body = MessagesRequest {
        model: call.model.to_string(),
        max_tokens: MAX_TOKENS,
        system: call.instruction.to_string(),
        messages: vec![ChatMessage::user(call.prompt)],
    };
    let request = call
        .http
        .post(construct_api_url(call.base_url, "messages"))
        .header("Content-Type", "application/json");
    let request = add_auth_headers(request, Provider::Anthropic, call.api_key).json(&body);

    let response: MessagesResponse = send_json(Provider::Anthropic, request).await?;
    non_empty_text(Provider::Anthropic, response.first_text())
}
