use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub session: SessionTimings,
    pub questions: QuestionsConfig,
    pub history: HistoryConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub recordings_path: String,
    /// Target rate for finalized recordings; capture decimates down to it
    /// when the device rate divides evenly.
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Scoring API endpoint. Empty means not configured; submissions fail
    /// with a surfaced alert instead of being attempted.
    pub api_url: String,
}

/// Fixed timings of the room flow.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionTimings {
    #[serde(default = "default_break_secs")]
    pub break_secs: u32,
    #[serde(default = "default_success_hold_secs")]
    pub success_hold_secs: u64,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            break_secs: default_break_secs(),
            success_hold_secs: default_success_hold_secs(),
        }
    }
}

fn default_break_secs() -> u32 {
    10
}

fn default_success_hold_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionsConfig {
    pub bank_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub dify: DifyConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DifyConfig {
    pub api_base: String,
    pub api_token: String,
}

impl Default for DifyConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.dify.ai/v1".to_string(),
            api_token: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
