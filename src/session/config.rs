use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::question::Mode;

/// Configuration for one speaking room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: Mode,

    /// Selected topic; `None` for full tests.
    pub topic_id: Option<String>,

    /// Signed-in user, when history should be kept.
    pub user_id: Option<String>,

    /// Fixed break between parts.
    pub break_secs: u32,

    /// How long the success status is held before the room completes.
    pub success_hold_secs: u64,

    /// Where finalized recordings land.
    pub recordings_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Practice,
            topic_id: None,
            user_id: None,
            break_secs: 10,
            success_hold_secs: 2,
            recordings_dir: PathBuf::from("recordings"),
        }
    }
}
