use serde::{Deserialize, Serialize};

use super::ChatError;
use crate::config::GeminiConfig;

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";

/// Fixed tutoring framing prepended to every question.
const TUTOR_PREAMBLE: &str = "You are a friendly, thorough English-learning assistant. \
Answer questions about English clearly and helpfully, with examples where they aid \
understanding.\n\nQuestion: ";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<TextPart>,
}

#[derive(Serialize, Deserialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<TextPart>>,
}

pub(super) async fn ask(
    http: &reqwest::Client,
    config: &GeminiConfig,
    message: &str,
) -> Result<String, ChatError> {
    if config.api_key.is_empty() {
        return Err(ChatError::NotConfigured);
    }

    let body = GeminiRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![TextPart {
                text: format!("{TUTOR_PREAMBLE}{message}"),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.7,
            max_output_tokens: 2048,
        },
    };

    let response = http
        .post(format!("{GEMINI_URL}?key={}", config.api_key))
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Api { status, body });
    }

    let parsed: GeminiResponse = response.json().await?;

    parsed
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .map(|parts| parts.into_iter().map(|p| p.text).collect::<String>())
        .filter(|a| !a.is_empty())
        .ok_or(ChatError::EmptyAnswer)
}
