use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::types::{Part, Question, Topic};

/// A topic record as stored in the bank file: topic metadata plus its
/// question rows.
#[derive(Debug, Clone, Deserialize)]
struct TopicRecord {
    id: String,
    part: Part,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    questions: Vec<QuestionRow>,
}

/// Raw question row. Ids are numeric within a topic and get namespaced as
/// `{topic}-{id}` when resolved.
#[derive(Debug, Clone, Deserialize)]
struct QuestionRow {
    id: u32,
    #[serde(default)]
    prompt: String,
    #[serde(default, deserialize_with = "super::types::coerce_secs")]
    prep_secs: u32,
    #[serde(default, deserialize_with = "super::types::coerce_secs")]
    speak_secs: u32,
    #[serde(default)]
    audio_cue: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct BankFile {
    topics: Vec<TopicRecord>,
}

/// The loaded question bank.
pub struct QuestionBank {
    topics: Vec<TopicRecord>,
}

impl QuestionBank {
    /// Load a bank from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question bank: {}", path.display()))?;
        let bank = Self::from_json(&raw)?;
        info!(
            "Question bank loaded: {} topics from {}",
            bank.topics.len(),
            path.display()
        );
        Ok(bank)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: BankFile =
            serde_json::from_str(raw).context("Failed to parse question bank JSON")?;
        Ok(Self {
            topics: file.topics,
        })
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topics for the selection screen, one part at a time.
    pub fn topics_by_part(&self, part: Part) -> Vec<Topic> {
        self.topics
            .iter()
            .filter(|t| t.part == part)
            .map(|t| Topic {
                id: t.id.clone(),
                part: t.part,
                title: t.title.clone(),
                description: t.description.clone(),
            })
            .collect()
    }

    /// Resolve a topic's question list. Unknown topics yield an empty list;
    /// the caller decides what an empty session means.
    pub fn questions_for_topic(&self, topic_id: &str) -> Vec<Question> {
        let Some(topic) = self.topics.iter().find(|t| t.id == topic_id) else {
            return Vec::new();
        };

        topic
            .questions
            .iter()
            .map(|row| Question {
                id: format!("{}-{}", topic.id, row.id),
                part: topic.part,
                topic_id: Some(topic.id.clone()),
                prompt: row.prompt.clone(),
                prep_secs: row.prep_secs,
                speak_secs: row.speak_secs,
                audio_cue: row.audio_cue.clone(),
            })
            .collect()
    }

    /// Assemble a full test: one randomly chosen topic per part, in part
    /// order. Parts with no topics are skipped.
    pub fn full_test(&self) -> Vec<Question> {
        let mut rng = rand::thread_rng();
        let mut questions = Vec::new();

        for part in Part::ALL {
            let candidates: Vec<&TopicRecord> =
                self.topics.iter().filter(|t| t.part == part).collect();
            if let Some(topic) = candidates.choose(&mut rng) {
                questions.extend(self.questions_for_topic(&topic.id));
            }
        }

        questions
    }
}
