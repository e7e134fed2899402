//! Feedback history persistence
//!
//! Records are keyed by user id, part number, and the topic reference id of
//! the session. Persistence is best effort: the room logs failures and
//! moves on.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::question::Part;
use crate::scoring::{Feedback, FeedbackDetails};

/// A saved feedback record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub user_id: String,
    pub part: Part,
    /// Reference id of the selected topic.
    pub part_ref: i64,
    pub overall_score: f64,
    pub transcript: String,
    pub details: FeedbackDetails,
    pub general_suggestions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// File-backed history store: one JSON file per record under
/// `{root}/{user_id}/`.
pub struct HistoryStore {
    root: PathBuf,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn save(
        &self,
        user_id: &str,
        part: Part,
        part_ref: i64,
        feedback: &Feedback,
    ) -> Result<PathBuf> {
        let dir = self.root.join(user_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create history directory: {}", dir.display()))?;

        let record = HistoryRecord {
            user_id: user_id.to_string(),
            part,
            part_ref,
            overall_score: feedback.overall_score,
            transcript: feedback.transcript.clone(),
            details: feedback.details.clone(),
            general_suggestions: feedback.general_suggestions.clone(),
            created_at: Utc::now(),
        };

        let path = dir.join(format!(
            "part{}-{}-{}.json",
            part,
            part_ref,
            record.created_at.timestamp_millis()
        ));

        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create history file: {}", path.display()))?;
        serde_json::to_writer_pretty(file, &record).context("Failed to write history record")?;

        info!("Feedback saved to history: {}", path.display());
        Ok(path)
    }

    /// All records for a user, newest first. Unreadable files are skipped.
    pub fn load_all(&self, user_id: &str) -> Result<Vec<HistoryRecord>> {
        let dir = self.root.join(user_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to read history directory: {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping unreadable history file {}: {e}", path.display()),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<HistoryRecord> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
