use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Session mode selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Practice,
    Test,
}

/// IELTS speaking part. Part 2 is the long-turn monologue and the only part
/// with preparation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Part {
    One,
    Two,
    Three,
}

impl Part {
    pub fn number(self) -> u8 {
        match self {
            Part::One => 1,
            Part::Two => 2,
            Part::Three => 3,
        }
    }

    pub const ALL: [Part; 3] = [Part::One, Part::Two, Part::Three];
}

impl TryFrom<u8> for Part {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Part::One),
            2 => Ok(Part::Two),
            3 => Ok(Part::Three),
            other => Err(format!("invalid speaking part: {other}")),
        }
    }
}

impl From<Part> for u8 {
    fn from(part: Part) -> Self {
        part.number()
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A topic as presented on the selection screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub part: Part,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// One question of a session. Immutable once loaded; owned by the session
/// for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub part: Part,
    #[serde(default)]
    pub topic_id: Option<String>,
    /// Prompt text. Empty for audio-only parts (1 and 3), where the cue
    /// carries the examiner's questions.
    #[serde(default)]
    pub prompt: String,
    /// Preparation seconds before speaking; nonzero only for part 2.
    #[serde(default, deserialize_with = "coerce_secs")]
    pub prep_secs: u32,
    /// Allotted speaking seconds.
    #[serde(default, deserialize_with = "coerce_secs")]
    pub speak_secs: u32,
    /// Optional WAV cue played before the answer.
    #[serde(default)]
    pub audio_cue: Option<PathBuf>,
}

/// Durations in bank files come from loosely-typed upstream data; accept
/// numbers or numeric strings and fall back to zero for anything else.
pub(crate) fn coerce_secs<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().map(|f| f.max(0.0) as u32).unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
