use serde::{Deserialize, Serialize};

/// Feedback returned by the scoring service. The room treats it as opaque
/// beyond an existence check; every field is optional on the wire with
/// numeric coercion and zero fallback, so a sparse response still
/// deserializes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default, deserialize_with = "coerce_score")]
    pub overall_score: f64,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub details: FeedbackDetails,
    #[serde(default)]
    pub general_suggestions: Vec<String>,
}

/// Per-criterion breakdown.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackDetails {
    #[serde(default)]
    pub fluency: CriterionFeedback,
    #[serde(default)]
    pub pronunciation: CriterionFeedback,
    #[serde(default)]
    pub grammar: CriterionFeedback,
    #[serde(default)]
    pub vocabulary: CriterionFeedback,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CriterionFeedback {
    #[serde(default, deserialize_with = "coerce_score")]
    pub score: f64,
    #[serde(default)]
    pub evaluation: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub feedback: String,
    /// Words per minute; only the fluency criterion carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wpm: Option<f64>,
}

impl Feedback {
    /// The four criterion scores in fluency/pronunciation/grammar/vocabulary
    /// order.
    pub fn criterion_scores(&self) -> [f64; 4] {
        [
            self.details.fluency.score,
            self.details.pronunciation.score,
            self.details.grammar.score,
            self.details.vocabulary.score,
        ]
    }
}

/// Scores arrive as numbers, numeric strings, or not at all; anything
/// unparseable reads as zero.
fn coerce_score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}
