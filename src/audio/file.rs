use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;

/// Shape of a finalized recording on disk. Used to sanity-check the WAV
/// before handing it to the scorer.
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub num_samples: usize,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let num_samples = reader.len() as usize;
        let duration_seconds =
            num_samples as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            num_samples,
        })
    }

    /// A recording with no captured audio is still submittable, but worth
    /// flagging in logs.
    pub fn is_silent(&self) -> bool {
        self.num_samples == 0
    }
}
