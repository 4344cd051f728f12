use super::{non_empty_text, send_json, Call, Provider, ProviderError};
use crate::api::{ChatCompletion, ChatMessage, ChatRequest};
use crate::utils::auth::add_auth_headers;
use crate::utils::url::construct_api_url;

pub(super) async fn complete(call: Call<'_>) -> Result<String, ProviderError> {
    let body = ChatRequest {
        model: call.model.to_string(),
        messages: vec![
            ChatMessage::system(call.instruction),
            ChatMessage::user(call.prompt),
        ],
        stream: false,
    };
    let request = call
        .http
        .post(construct_api_url(call.base_url, "chat/completions"))
        .header("Content-Type", "application/json");
    let request = add_auth_headers(request, Provider::OpenAI, call.api_key).json(&body);

    let completion: ChatCompletion = send_json(Provider::OpenAI, request).await?;
    non_empty_text(Provider::OpenAI, completion.first_text())
}
