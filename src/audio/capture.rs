use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{info, warn};

use super::recorder::{Recorder, RecorderError, RecorderFactory};

/// Microphone recorder backed by a cpal input stream.
///
/// The stream lives on a dedicated thread (cpal streams are not `Send`) and
/// feeds a shared sample buffer. Pause/resume gate the intake with an atomic
/// flag instead of touching the device: one continuous capture per handle,
/// with silent spans simply not recorded. Finalize stops the thread, writes
/// the buffer as WAV to a spool file, and moves it into the recordings
/// directory.
pub struct MicRecorder {
    target_rate: u32,
    gate: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<i16>>>,
    worker: Option<Worker>,
    capture_rate: Option<u32>,
    finalized: bool,
}

struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl MicRecorder {
    /// `target_rate` is what the finalized WAV should use; capture runs at
    /// the device rate and is decimated down when the rates divide evenly.
    pub fn new(target_rate: u32) -> Self {
        Self {
            target_rate,
            gate: Arc::new(AtomicBool::new(false)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            worker: None,
            capture_rate: None,
            finalized: false,
        }
    }

    /// Open the default input device on a fresh thread and start streaming
    /// samples into the shared buffer.
    fn spawn_capture(&mut self) -> Result<(), RecorderError> {
        let gate = Arc::clone(&self.gate);
        let buffer = Arc::clone(&self.buffer);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, RecorderError>>();

        let handle = std::thread::spawn(move || {
            let stream = match build_input_stream(gate, buffer) {
                Ok((stream, rate)) => {
                    let _ = ready_tx.send(Ok(rate));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Park until told to stop; dropping the stream releases the
            // device.
            let _ = stop_rx.recv();
            drop(stream);
        });

        let rate = ready_rx
            .recv()
            .map_err(|_| RecorderError::Device("capture thread exited unexpectedly".into()))??;

        self.capture_rate = Some(rate);
        self.worker = Some(Worker { stop_tx, handle });
        info!("Capture started at {} Hz (mono)", rate);

        Ok(())
    }

    fn stop_worker(&mut self) -> Result<(), RecorderError> {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            worker
                .handle
                .join()
                .map_err(|_| RecorderError::Device("capture thread panicked".into()))?;
        }
        Ok(())
    }
}

impl Recorder for MicRecorder {
    fn start(&mut self) -> Result<(), RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }

        if self.worker.is_some() {
            // Device already held; just reopen the gate.
            self.gate.store(true, Ordering::SeqCst);
            return Ok(());
        }

        self.spawn_capture()?;
        self.gate.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }
        if self.worker.is_none() {
            return Err(RecorderError::Device("no active capture".into()));
        }

        self.gate.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }
        if self.worker.is_none() {
            return Err(RecorderError::Device("no active capture".into()));
        }

        self.gate.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn finalize(&mut self, dir: &Path, file_name: &str) -> Result<PathBuf, RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }

        self.gate.store(false, Ordering::SeqCst);
        self.stop_worker()?;
        self.finalized = true;

        let rate = self
            .capture_rate
            .ok_or_else(|| RecorderError::Device("recording never started".into()))?;

        let samples = {
            let mut buffer = self
                .buffer
                .lock()
                .map_err(|_| RecorderError::Device("sample buffer poisoned".into()))?;
            std::mem::take(&mut *buffer)
        };

        let (samples, rate) = decimate(samples, rate, self.target_rate);

        // Spool next to the temp dir first, then move into the recordings
        // directory. When the move fails (read-only target, cross-device
        // rename) the spool location is used unmodified.
        let spool = std::env::temp_dir().join(file_name);
        write_wav(&spool, rate, &samples)?;

        let target = dir.join(file_name);
        if let Err(e) = std::fs::create_dir_all(dir).and_then(|_| std::fs::rename(&spool, &target))
        {
            warn!(
                "Could not move recording to {} ({e}); keeping {}",
                target.display(),
                spool.display()
            );
            return Ok(spool);
        }

        info!("Recording saved to {}", target.display());
        Ok(target)
    }

    fn abort(&mut self) {
        self.gate.store(false, Ordering::SeqCst);
        if let Err(e) = self.stop_worker() {
            warn!("Capture teardown failed (ignored): {e}");
        }
        self.finalized = true;
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
    }

    fn is_recording(&self) -> bool {
        !self.finalized && self.worker.is_some() && self.gate.load(Ordering::SeqCst)
    }
}

impl Drop for MicRecorder {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.abort();
        }
    }
}

/// Build the cpal input stream. Samples are downmixed to mono i16 and
/// appended to `buffer` while `gate` is open.
fn build_input_stream(
    gate: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<i16>>>,
) -> Result<(cpal::Stream, u32), RecorderError> {
    let host = cpal::default_host();

    let device = host.default_input_device().ok_or_else(|| {
        RecorderError::PermissionDenied("no input device available".to_string())
    })?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let config: cpal::StreamConfig = device
        .default_input_config()
        .map_err(|e| RecorderError::Device(format!("Failed to get input config: {e}")))?
        .into();

    let rate = config.sample_rate.0;
    let channels = config.channels as usize;

    let err_fn = |err| {
        tracing::error!("Audio input stream error: {err}");
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !gate.load(Ordering::SeqCst) {
                    return;
                }

                let mut buffer = match buffer.lock() {
                    Ok(guard) => guard,
                    Err(_) => return,
                };

                // Average channels to mono, convert to i16 PCM.
                for frame in data.chunks(channels) {
                    let mono = frame.iter().sum::<f32>() / channels as f32;
                    let sample = (mono * i16::MAX as f32)
                        .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                    buffer.push(sample);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| RecorderError::Device(format!("Failed to build input stream: {e}")))?;

    stream
        .play()
        .map_err(|e| RecorderError::Device(format!("Failed to start input stream: {e}")))?;

    Ok((stream, rate))
}

/// Downsample by decimation when the device rate is an integer multiple of
/// the target; anything else keeps the capture rate.
fn decimate(samples: Vec<i16>, capture_rate: u32, target_rate: u32) -> (Vec<i16>, u32) {
    if target_rate == 0 || capture_rate <= target_rate || capture_rate % target_rate != 0 {
        return (samples, capture_rate);
    }

    let ratio = (capture_rate / target_rate) as usize;
    let decimated: Vec<i16> = samples.iter().step_by(ratio).copied().collect();
    (decimated, target_rate)
}

fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) -> Result<(), RecorderError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(())
}

/// Factory producing microphone handles.
pub struct MicRecorderFactory {
    target_sample_rate: u32,
}

impl MicRecorderFactory {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }
}

impl RecorderFactory for MicRecorderFactory {
    fn create(&self) -> Result<Box<dyn Recorder>, RecorderError> {
        Ok(Box::new(MicRecorder::new(self.target_sample_rate)))
    }
}
