//! Chatbot backends
//!
//! Two independent chat completion APIs, selected by a user-chosen mode.
//! Each returns a single text answer; when a backend fails, the caller gets
//! a canned local response instead of an error.

mod dify;
mod gemini;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::ChatConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Dify,
    Gemini,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat api key not configured")]
    NotConfigured,

    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat api returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("chat api returned no answer")]
    EmptyAnswer,
}

/// Client over both chat backends.
pub struct ChatClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Ask the selected backend. `conversation_id` threads a Dify
    /// conversation; Gemini ignores it.
    pub async fn ask(
        &self,
        mode: ChatMode,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<String, ChatError> {
        match mode {
            ChatMode::Dify => {
                dify::ask(&self.http, &self.config.dify, message, conversation_id).await
            }
            ChatMode::Gemini => gemini::ask(&self.http, &self.config.gemini, message).await,
        }
    }

    /// Ask the selected backend, degrading to a canned local answer when it
    /// fails.
    pub async fn ask_or_fallback(
        &self,
        mode: ChatMode,
        message: &str,
        conversation_id: Option<&str>,
    ) -> String {
        match self.ask(mode, message, conversation_id).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Chat backend {mode:?} failed, using fallback: {e}");
                fallback_answer(mode).to_string()
            }
        }
    }
}

const DIFY_FALLBACKS: &[&str] = &[
    "Sorry, I ran into a technical problem. Please try again in a moment.",
    "I can't reach the assistant right now. Check your connection and retry.",
    "Something went wrong on my side. Give it another try shortly.",
];

const GEMINI_FALLBACKS: &[&str] = &[
    "Sorry, I couldn't process that question right now. Please try again.",
    "The study assistant is unavailable at the moment. Try again soon.",
    "An error occurred while answering. Please retry in a few seconds.",
];

fn fallback_answer(mode: ChatMode) -> &'static str {
    let pool = match mode {
        ChatMode::Dify => DIFY_FALLBACKS,
        ChatMode::Gemini => GEMINI_FALLBACKS,
    };
    pool.choose(&mut rand::thread_rng()).copied().unwrap_or(pool[0])
}
