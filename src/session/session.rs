use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::state::{Countdown, RoomAction, RoomEvent, RoomMachine, RoomState};
use crate::audio::{
    ignore_device_error, recording_file_name, AudioFile, CuePlayer, Recorder, RecorderFactory,
};
use crate::history::HistoryStore;
use crate::question::{Mode, Part, Question};
use crate::scoring::{Feedback, ScoringClient};

/// Submission progress as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStatus {
    Analyzing,
    Success,
    Error,
}

/// Collaborators a session needs. Injected so the flow is testable with
/// scripted recorders and an instant cue player.
pub struct SessionDeps {
    pub recorder_factory: Arc<dyn RecorderFactory>,
    pub cue_player: Arc<dyn CuePlayer>,
    pub scoring: Arc<ScoringClient>,
    pub history: Option<Arc<HistoryStore>>,
}

/// One speaking room, end to end: cue playback, preparation, capture,
/// breaks, and the final submission. Exactly one session is active per
/// room; all transitions run on its owner's task.
pub struct SpeakingSession {
    config: SessionConfig,
    machine: RoomMachine,
    deps: SessionDeps,
    recorder: Option<Box<dyn Recorder>>,
    scoring_status: Option<ScoringStatus>,
    feedback: Option<Feedback>,
    alert: Option<String>,
    started_at: DateTime<Utc>,
}

/// Serializable view of the room for the control API.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub mode: Mode,
    pub state: RoomState,
    pub question_index: usize,
    pub question_count: usize,
    pub question: Option<Question>,
    pub countdown: Option<Countdown>,
    pub scoring_status: Option<ScoringStatus>,
    pub alert: Option<String>,
    pub complete: bool,
    pub halted: bool,
    pub feedback: Option<Feedback>,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

impl SpeakingSession {
    pub fn new(config: SessionConfig, questions: Vec<Question>, deps: SessionDeps) -> Self {
        info!(
            "Creating speaking session: mode={:?}, {} questions",
            config.mode,
            questions.len()
        );

        let machine = RoomMachine::new(config.mode, questions, config.break_secs);

        Self {
            config,
            machine,
            deps,
            recorder: None,
            scoring_status: None,
            feedback: None,
            alert: None,
            started_at: Utc::now(),
        }
    }

    /// User pressed the play button.
    pub async fn press_play(&mut self) {
        self.dispatch(RoomEvent::PlayPressed).await;
    }

    /// Practice only: skip the part-2 preparation countdown.
    pub async fn skip_preparation(&mut self) {
        self.dispatch(RoomEvent::SkipPreparation).await;
    }

    /// User advanced from the finished card.
    pub async fn advance(&mut self) {
        self.dispatch(RoomEvent::Advance).await;
    }

    /// Practice only: leave an active recording for the next question.
    pub async fn skip_to_next(&mut self) {
        self.dispatch(RoomEvent::SkipToNext).await;
    }

    /// One second elapsed.
    pub async fn tick(&mut self) {
        self.dispatch(RoomEvent::Tick).await;
    }

    /// Room teardown: stop the cue, release any active recording, and
    /// swallow errors from an already-released device.
    pub fn shutdown(&mut self) {
        self.deps.cue_player.stop();
        if let Some(mut recorder) = self.recorder.take() {
            recorder.abort();
        }
        info!("Speaking session shut down");
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let duration = Utc::now().signed_duration_since(self.started_at);

        RoomSnapshot {
            mode: self.machine.mode(),
            state: self.machine.state(),
            question_index: self.machine.question_index(),
            question_count: self.machine.question_count(),
            question: self.machine.current_question().cloned(),
            countdown: self.machine.countdown(),
            scoring_status: self.scoring_status,
            alert: self.alert.clone(),
            complete: self.machine.is_complete(),
            halted: self.machine.is_halted(),
            feedback: self.feedback.clone(),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
        }
    }

    /// The feedback handed to the results contract, if submission
    /// succeeded.
    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Feed an event through the machine and execute the resulting actions.
    /// Actions that complete (cue done, recording started) queue follow-up
    /// events rather than recursing.
    async fn dispatch(&mut self, event: RoomEvent) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            for action in self.machine.apply(event) {
                if let Some(follow_up) = self.execute(action).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn execute(&mut self, action: RoomAction) -> Option<RoomEvent> {
        match action {
            RoomAction::PlayCue => Some(self.play_cue().await),
            RoomAction::StartRecording => Some(self.start_recording()),
            RoomAction::PauseRecording => {
                self.pause_recording();
                None
            }
            RoomAction::FinalizePart { part } => {
                self.finish_part(part).await;
                None
            }
            RoomAction::FinalizeSession => {
                self.finish_session().await;
                None
            }
        }
    }

    /// Play the current question's cue. The recorder must not capture the
    /// prompt audio, so any live recording is paused first. Cue failures
    /// are not fatal; the flow continues as if the cue finished.
    async fn play_cue(&mut self) -> RoomEvent {
        if let Some(recorder) = self.recorder.as_mut() {
            if recorder.is_recording() {
                ignore_device_error("pause before cue", recorder.pause());
            }
        }

        let cue = self
            .machine
            .current_question()
            .and_then(|q| q.audio_cue.clone());

        if let Some(cue) = cue {
            if let Err(e) = self.deps.cue_player.play(&cue).await {
                warn!("Cue playback failed, continuing: {e}");
            }
        }

        RoomEvent::CueFinished
    }

    /// Start or resume capture. The first start of a handle is where
    /// device permission is requested; denial halts the flow at this
    /// question with no retry.
    fn start_recording(&mut self) -> RoomEvent {
        let result = match self.recorder.as_mut() {
            // Already live across a same-part boundary; nothing to do.
            Some(recorder) if recorder.is_recording() => Ok(()),
            Some(recorder) => recorder.resume(),
            None => match self.deps.recorder_factory.create() {
                Ok(mut recorder) => {
                    let started = recorder.start();
                    if started.is_ok() {
                        self.recorder = Some(recorder);
                    }
                    started
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(()) => RoomEvent::RecordingStarted,
            Err(e) => {
                error!("Failed to start recording: {e}");
                self.alert = Some("Microphone unavailable. Recording cannot start.".to_string());
                RoomEvent::RecordingFailed
            }
        }
    }

    fn pause_recording(&mut self) {
        if let Some(recorder) = self.recorder.as_mut() {
            ignore_device_error("pause recording", recorder.pause());
        }
    }

    /// Practice-mode part boundary: finalize the part's handle and submit
    /// it while the break runs. The next part gets a fresh handle.
    async fn finish_part(&mut self, part: Part) {
        let Some(path) = self.finalize_recorder(part) else {
            return;
        };
        self.submit(path, part, false).await;
    }

    /// End of flow: finalize whatever handle is live and submit the whole
    /// scope.
    async fn finish_session(&mut self) {
        let part = self
            .machine
            .current_question()
            .map(|q| q.part)
            .unwrap_or(Part::One);

        let Some(path) = self.finalize_recorder(part) else {
            return;
        };

        match AudioFile::open(&path) {
            Ok(audio) if audio.is_silent() => {
                warn!("Finalized recording {} holds no audio", audio.path)
            }
            Ok(audio) => info!(
                "Finalized recording: {:.1}s at {} Hz",
                audio.duration_seconds, audio.sample_rate
            ),
            Err(e) => warn!("Could not inspect finalized recording: {e}"),
        }

        self.submit(path, part, true).await;
    }

    /// Stop and release the active handle, writing the capture under its
    /// deterministic name. Returns `None` when there is nothing to
    /// finalize or the device failed; the flow proceeds without feedback.
    fn finalize_recorder(&mut self, part: Part) -> Option<PathBuf> {
        let mut recorder = self.recorder.take()?;

        let file_name = recording_file_name(self.config.mode, part);
        match recorder.finalize(&self.config.recordings_dir, &file_name) {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Failed to finalize recording: {e}");
                None
            }
        }
    }

    /// Submit a finalized recording with the question texts in scope:
    /// the given part in practice mode, everything in test mode. On
    /// success the feedback is held for the results contract and
    /// best-effort persisted; on failure an alert is surfaced and the
    /// room proceeds with no result.
    async fn submit(&mut self, path: PathBuf, part: Part, is_final: bool) {
        let questions: Vec<String> = match self.config.mode {
            Mode::Test => self
                .machine
                .questions()
                .iter()
                .map(|q| q.prompt.clone())
                .collect(),
            Mode::Practice => self
                .machine
                .questions()
                .iter()
                .filter(|q| q.part == part)
                .map(|q| q.prompt.clone())
                .collect(),
        };

        self.scoring_status = Some(ScoringStatus::Analyzing);

        match self.deps.scoring.submit(&path, &questions).await {
            Ok(feedback) => {
                self.persist_history(part, &feedback);
                self.feedback = Some(feedback);

                if is_final {
                    self.scoring_status = Some(ScoringStatus::Success);
                    // Let the caller see the success status before the room
                    // reports complete.
                    tokio::time::sleep(Duration::from_secs(self.config.success_hold_secs)).await;
                } else {
                    self.scoring_status = None;
                }
            }
            Err(e) => {
                error!("Scoring submission failed: {e}");
                self.scoring_status = Some(ScoringStatus::Error);
                self.alert =
                    Some("Failed to process recording. Please try again.".to_string());
            }
        }
    }

    /// Best effort: failures are logged and never block progression.
    fn persist_history(&self, part: Part, feedback: &Feedback) {
        let (Some(user_id), Some(store)) = (&self.config.user_id, &self.deps.history) else {
            return;
        };

        let part_ref = self
            .machine
            .questions()
            .first()
            .and_then(|q| q.topic_id.as_ref())
            .and_then(|id| id.parse::<i64>().ok())
            .unwrap_or(1);

        if let Err(e) = store.save(user_id, part, part_ref, feedback) {
            warn!("Failed to persist feedback history: {e}");
        }
    }
}

impl Drop for SpeakingSession {
    fn drop(&mut self) {
        if self.recorder.is_some() {
            self.shutdown();
        }
    }
}
