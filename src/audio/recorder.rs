use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::question::{Mode, Part};

/// Errors from the capture device.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The platform refused access to the input device. Recording cannot
    /// start; the room halts at the current question.
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("capture device error: {0}")]
    Device(String),

    /// The handle was already finalized. A finalized handle is never
    /// reused; callers create a fresh one through the factory.
    #[error("recording already finalized")]
    Finalized,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),
}

/// One recording handle. A single handle spans every question of a part in
/// practice mode, or the entire test in test mode. It may be paused and
/// resumed any number of times, but is finalized at most once.
pub trait Recorder: Send {
    /// Acquire the capture device (the first call is where permission is
    /// requested) and begin taking samples. Also used to continue after the
    /// handle was created but the device gate closed.
    fn start(&mut self) -> Result<(), RecorderError>;

    /// Stop taking samples without releasing the device.
    fn pause(&mut self) -> Result<(), RecorderError>;

    /// Take samples again after a pause.
    fn resume(&mut self) -> Result<(), RecorderError>;

    /// Release the device and write the captured audio into `dir` under
    /// `file_name`. Returns the final location, which is the original
    /// capture spool when the move into `dir` fails. At most once per
    /// handle.
    fn finalize(&mut self, dir: &Path, file_name: &str) -> Result<PathBuf, RecorderError>;

    /// Release the device and discard the captured audio. Used on room
    /// teardown; must not fail.
    fn abort(&mut self);

    /// Whether samples are currently being taken.
    fn is_recording(&self) -> bool;
}

/// Creates recording handles. A fresh handle is needed after every
/// finalize, so the session holds a factory rather than a single recorder.
pub trait RecorderFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Recorder>, RecorderError>;
}

/// Deterministic name for a finalized recording, encoding mode and
/// part/timestamp.
pub fn recording_file_name(mode: Mode, part: Part) -> String {
    let stamp = Utc::now().timestamp_millis();
    match mode {
        Mode::Test => format!("recording-full-test-{stamp}.wav"),
        Mode::Practice => format!("recording-part-{part}-{stamp}.wav"),
    }
}

/// Pause/stop on an already-released device is non-fatal: log it and let
/// the flow proceed as if the operation succeeded.
pub fn ignore_device_error(op: &str, result: Result<(), RecorderError>) {
    if let Err(e) = result {
        warn!("{op} failed on capture device (ignored): {e}");
    }
}
