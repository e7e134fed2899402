use anyhow::{Context, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Plays a question's audio cue and resolves when playback ends.
#[async_trait]
pub trait CuePlayer: Send + Sync {
    async fn play(&self, cue: &Path) -> Result<()>;

    /// Cancel any in-flight cue. Used on room teardown.
    fn stop(&self);
}

/// Cue player backed by the default output device.
pub struct DeviceCuePlayer {
    cancel: Arc<AtomicBool>,
}

impl DeviceCuePlayer {
    pub fn new() -> Self {
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for DeviceCuePlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CuePlayer for DeviceCuePlayer {
    async fn play(&self, cue: &Path) -> Result<()> {
        self.cancel.store(false, Ordering::SeqCst);

        let cue: PathBuf = cue.to_path_buf();
        let cancel = Arc::clone(&self.cancel);

        // The output stream is not Send; decode and play on a blocking
        // thread and await its completion.
        tokio::task::spawn_blocking(move || play_blocking(&cue, cancel))
            .await
            .context("Cue playback task panicked")?
    }

    fn stop(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

fn play_blocking(cue: &Path, cancel: Arc<AtomicBool>) -> Result<()> {
    let reader = hound::WavReader::open(cue)
        .with_context(|| format!("Failed to open cue: {}", cue.display()))?;

    let spec = reader.spec();
    let cue_channels = spec.channels as usize;

    // Downmix the cue to mono f32 up front.
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let raw: Vec<i16> = reader
                .into_samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read cue samples")?;
            raw.chunks(cue_channels)
                .map(|frame| {
                    frame.iter().map(|&s| s as f32 / i16::MAX as f32).sum::<f32>()
                        / cue_channels as f32
                })
                .collect()
        }
        hound::SampleFormat::Float => {
            let raw: Vec<f32> = reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read cue samples")?;
            raw.chunks(cue_channels)
                .map(|frame| frame.iter().sum::<f32>() / cue_channels as f32)
                .collect()
        }
    };

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No output device found")?;
    let config: cpal::StreamConfig = device
        .default_output_config()
        .context("Failed to get output config")?
        .into();

    if config.sample_rate.0 != spec.sample_rate {
        // No resampling; cues are expected to ship at a device-friendly
        // rate.
        warn!(
            "Cue rate {} Hz differs from device rate {} Hz",
            spec.sample_rate, config.sample_rate.0
        );
    }

    let out_channels = config.channels as usize;
    let total = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));

    let cb_samples = Arc::clone(&samples);
    let cb_position = Arc::clone(&position);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut idx = cb_position.load(Ordering::Relaxed);
                for frame in data.chunks_mut(out_channels) {
                    let sample = cb_samples.get(idx).copied().unwrap_or(0.0);
                    for slot in frame {
                        *slot = sample;
                    }
                    idx += 1;
                }
                cb_position.store(idx, Ordering::Relaxed);
            },
            |err| tracing::error!("Audio output stream error: {err}"),
            None,
        )
        .context("Failed to build output stream")?;

    stream.play().context("Failed to start output stream")?;
    info!("Playing cue: {}", cue.display());

    while position.load(Ordering::Relaxed) < total && !cancel.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(20));
    }

    drop(stream);
    Ok(())
}
