use serde::{Deserialize, Serialize};

use super::ChatError;
use crate::config::DifyConfig;

#[derive(Serialize)]
struct DifyRequest<'a> {
    inputs: serde_json::Value,
    query: &'a str,
    response_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    conversation_id: Option<&'a str>,
    user: &'static str,
}

#[derive(Deserialize)]
struct DifyResponse {
    answer: Option<String>,
    data: Option<DifyData>,
}

#[derive(Deserialize)]
struct DifyData {
    answer: Option<String>,
}

/// Blocking-mode chat completion against the Dify `chat-messages` endpoint.
pub(super) async fn ask(
    http: &reqwest::Client,
    config: &DifyConfig,
    message: &str,
    conversation_id: Option<&str>,
) -> Result<String, ChatError> {
    if config.api_token.is_empty() {
        return Err(ChatError::NotConfigured);
    }

    let body = DifyRequest {
        inputs: serde_json::json!({}),
        query: message,
        response_mode: "blocking",
        conversation_id,
        user: "speakroom",
    };

    let response = http
        .post(format!("{}/chat-messages", config.api_base))
        .bearer_auth(&config.api_token)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Api { status, body });
    }

    let parsed: DifyResponse = response.json().await?;

    parsed
        .answer
        .or_else(|| parsed.data.and_then(|d| d.answer))
        .filter(|a| !a.is_empty())
        .ok_or(ChatError::EmptyAnswer)
}
