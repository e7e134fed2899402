use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use super::feedback::Feedback;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring api url not configured")]
    NotConfigured,

    #[error("failed to read recording {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("scoring request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scoring api returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Client for the remote speaking scorer.
pub struct ScoringClient {
    http: reqwest::Client,
    api_url: String,
}

impl ScoringClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    /// Submit a finalized recording and the question texts in scope.
    ///
    /// The body is multipart: the audio under `file`, each question as a
    /// repeated `questions` field. No timeout beyond the client default; a
    /// stuck scorer blocks the caller.
    pub async fn submit(
        &self,
        audio: &Path,
        questions: &[String],
    ) -> Result<Feedback, ScoringError> {
        if self.api_url.is_empty() {
            return Err(ScoringError::NotConfigured);
        }

        let bytes = tokio::fs::read(audio).await.map_err(|source| ScoringError::Read {
            path: audio.to_path_buf(),
            source,
        })?;

        info!(
            "Submitting {} ({} bytes, {} questions) to scorer",
            audio.display(),
            bytes.len(),
            questions.len()
        );

        let file_part = Part::bytes(bytes)
            .file_name(wav_file_name(audio))
            .mime_str("audio/wav")?;

        let mut form = Form::new().part("file", file_part);
        for question in questions {
            form = form.text("questions", question.clone());
        }

        let response = self.http.post(&self.api_url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Api { status, body });
        }

        let feedback = response.json::<Feedback>().await?;
        info!(
            "Feedback received: overall {:.1}",
            feedback.overall_score
        );

        Ok(feedback)
    }
}

/// The scorer expects a `.wav` filename regardless of the source path.
fn wav_file_name(audio: &Path) -> String {
    let stem = audio
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");
    format!("{stem}.wav")
}
