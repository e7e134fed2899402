// End-to-end session tests: a scripted recorder, an instant cue player,
// and an in-process axum stub standing in for the scoring API.

use anyhow::Result;
use async_trait::async_trait;
use axum::{body::Bytes, http::StatusCode, routing::post, Json, Router};
use speakroom::{
    CountdownKind, CuePlayer, HistoryStore, Mode, Part, Question, Recorder, RecorderError,
    RecorderFactory, RoomState, ScoringClient, ScoringStatus, SessionConfig, SessionDeps,
    SpeakingSession,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Default)]
struct RecorderLog {
    created: usize,
    started: usize,
    paused: usize,
    resumed: usize,
    finalized: usize,
}

type SharedLog = Arc<Mutex<RecorderLog>>;

/// Scripted recorder that writes a real (tiny) WAV on finalize so the
/// submission path can read it back.
struct FakeRecorder {
    log: SharedLog,
    recording: bool,
    finalized: bool,
}

impl Recorder for FakeRecorder {
    fn start(&mut self) -> Result<(), RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }
        self.log.lock().unwrap().started += 1;
        self.recording = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }
        self.log.lock().unwrap().paused += 1;
        self.recording = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }
        self.log.lock().unwrap().resumed += 1;
        self.recording = true;
        Ok(())
    }

    fn finalize(&mut self, dir: &Path, file_name: &str) -> Result<PathBuf, RecorderError> {
        if self.finalized {
            return Err(RecorderError::Finalized);
        }
        self.finalized = true;
        self.recording = false;
        self.log.lock().unwrap().finalized += 1;

        std::fs::create_dir_all(dir)?;
        let path = dir.join(file_name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec)?;
        for sample in [0i16, 128, -128, 64] {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(path)
    }

    fn abort(&mut self) {
        self.recording = false;
        self.finalized = true;
    }

    fn is_recording(&self) -> bool {
        self.recording && !self.finalized
    }
}

struct FakeFactory {
    log: SharedLog,
}

impl RecorderFactory for FakeFactory {
    fn create(&self) -> Result<Box<dyn Recorder>, RecorderError> {
        self.log.lock().unwrap().created += 1;
        Ok(Box::new(FakeRecorder {
            log: Arc::clone(&self.log),
            recording: false,
            finalized: false,
        }))
    }
}

/// Factory whose recorder can never start; exercises the halt path.
struct DeniedFactory;

impl RecorderFactory for DeniedFactory {
    fn create(&self) -> Result<Box<dyn Recorder>, RecorderError> {
        Err(RecorderError::PermissionDenied(
            "no input device available".into(),
        ))
    }
}

/// Cue player that finishes immediately.
struct InstantCue;

#[async_trait]
impl CuePlayer for InstantCue {
    async fn play(&self, _cue: &Path) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}
}

// ============================================================================
// Scoring stub
// ============================================================================

fn feedback_json() -> serde_json::Value {
    serde_json::json!({
        "overall_score": 6.5,
        "transcript": "I would like to talk about...",
        "details": {
            "fluency": {"score": 6.0, "evaluation": "good", "errors": [], "feedback": "keep going", "wpm": 110.0},
            "pronunciation": {"score": 6.5, "evaluation": "clear", "errors": [], "feedback": ""},
            "grammar": {"score": 7.0, "evaluation": "varied", "errors": ["tense slip"], "feedback": ""},
            "vocabulary": {"score": 6.5, "evaluation": "adequate", "errors": [], "feedback": ""}
        },
        "general_suggestions": ["Expand your answers."]
    })
}

/// Spawn a one-route scorer that records each request body and replies with
/// the given status and JSON. Returns the endpoint URL.
async fn spawn_scorer(
    status: StatusCode,
    body: serde_json::Value,
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
) -> String {
    let app = Router::new().route(
        "/speaking/score",
        post(move |raw: Bytes| {
            let body = body.clone();
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(raw.to_vec());
                (status, Json(body))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/speaking/score")
}

// ============================================================================
// Fixtures
// ============================================================================

fn question(id: &str, part: Part, prep_secs: u32, speak_secs: u32) -> Question {
    Question {
        id: id.to_string(),
        part,
        topic_id: Some("201".to_string()),
        prompt: format!("prompt {id}"),
        prep_secs,
        speak_secs,
        audio_cue: None,
    }
}

struct Fixture {
    session: SpeakingSession,
    log: SharedLog,
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
    #[allow(dead_code)]
    dirs: (TempDir, TempDir),
}

async fn fixture(
    mode: Mode,
    questions: Vec<Question>,
    scorer_status: StatusCode,
    user_id: Option<&str>,
) -> Fixture {
    let recordings = TempDir::new().unwrap();
    let history_dir = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let url = spawn_scorer(scorer_status, feedback_json(), Arc::clone(&seen)).await;

    let log: SharedLog = Arc::new(Mutex::new(RecorderLog::default()));

    let config = SessionConfig {
        mode,
        topic_id: Some("201".to_string()),
        user_id: user_id.map(str::to_string),
        break_secs: 2,
        success_hold_secs: 0,
        recordings_dir: recordings.path().to_path_buf(),
    };

    let deps = SessionDeps {
        recorder_factory: Arc::new(FakeFactory {
            log: Arc::clone(&log),
        }),
        cue_player: Arc::new(InstantCue),
        scoring: Arc::new(ScoringClient::new(url)),
        history: Some(Arc::new(HistoryStore::new(history_dir.path()))),
    };

    Fixture {
        session: SpeakingSession::new(config, questions, deps),
        log,
        seen,
        dirs: (recordings, history_dir),
    }
}

fn count_question_fields(body: &[u8]) -> usize {
    let text = String::from_utf8_lossy(body);
    text.matches("name=\"questions\"").count()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn practice_part_keeps_one_recording_across_questions() -> Result<()> {
    let questions = vec![
        question("q1", Part::One, 0, 2),
        question("q2", Part::One, 0, 2),
    ];
    let mut fx = fixture(Mode::Practice, questions, StatusCode::OK, None).await;

    fx.session.press_play().await;
    let snap = fx.session.snapshot();
    assert_eq!(snap.state, RoomState::Recording);
    assert_eq!(snap.countdown.map(|c| c.kind), Some(CountdownKind::Speak));
    assert_eq!(fx.log.lock().unwrap().created, 1);

    // Speak countdown runs out with a sibling remaining: recording stays
    // live through finished and the same-part advance.
    fx.session.tick().await;
    fx.session.tick().await;
    assert_eq!(fx.session.snapshot().state, RoomState::Finished);
    assert_eq!(fx.log.lock().unwrap().paused, 0);

    fx.session.advance().await;
    assert_eq!(fx.session.snapshot().state, RoomState::Idle);
    assert_eq!(fx.session.snapshot().question_index, 1);

    // Playing the next cue pauses the live recording, then resumes the same
    // handle; no second recorder is created.
    fx.session.press_play().await;
    let log = fx.log.lock().unwrap();
    assert_eq!(log.created, 1);
    assert_eq!(log.paused, 1);
    assert_eq!(log.resumed, 1);

    Ok(())
}

#[tokio::test]
async fn practice_part_boundary_finalizes_and_submits_the_part() -> Result<()> {
    let questions = vec![
        question("q1", Part::One, 0, 1),
        question("q2", Part::Two, 1, 1),
    ];
    let mut fx = fixture(Mode::Practice, questions, StatusCode::OK, Some("user-7")).await;

    fx.session.press_play().await;
    fx.session.tick().await; // speak ends, boundary: paused
    fx.session.advance().await; // break + part finalized + submitted

    let snap = fx.session.snapshot();
    assert_eq!(snap.state, RoomState::Break);
    assert_eq!(snap.countdown.map(|c| c.remaining), Some(2));
    assert_eq!(fx.log.lock().unwrap().finalized, 1);

    // The intermediate submission carried only part-1 questions.
    {
        let seen = fx.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(count_question_fields(&seen[0]), 1);
    }

    // History was persisted for the signed-in user.
    let history = HistoryStore::new(fx.dirs.1.path());
    let records = history.load_all("user-7")?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].part, Part::One);
    assert!((records[0].overall_score - 6.5).abs() < f64::EPSILON);

    // Break runs out; the next part gets a fresh handle.
    fx.session.tick().await;
    fx.session.tick().await;
    assert_eq!(fx.session.snapshot().state, RoomState::Idle);

    fx.session.press_play().await;
    assert_eq!(fx.session.snapshot().state, RoomState::Preparing);
    fx.session.skip_preparation().await;
    assert_eq!(fx.log.lock().unwrap().created, 2);

    // Last question: timeout, advance, final submission.
    fx.session.tick().await;
    fx.session.advance().await;

    let snap = fx.session.snapshot();
    assert!(snap.complete);
    assert_eq!(snap.scoring_status, Some(ScoringStatus::Success));
    let feedback = snap.feedback.expect("final feedback present");
    assert!((feedback.overall_score - 6.5).abs() < f64::EPSILON);
    assert_eq!(fx.log.lock().unwrap().finalized, 2);
    assert_eq!(fx.seen.lock().unwrap().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_mode_submits_everything_once_at_the_end() -> Result<()> {
    let questions = vec![
        question("q1", Part::One, 0, 1),
        question("q2", Part::Two, 0, 1),
        question("q3", Part::Three, 0, 1),
    ];
    let mut fx = fixture(Mode::Test, questions, StatusCode::OK, None).await;

    // Part 1.
    fx.session.press_play().await;
    fx.session.tick().await;
    fx.session.advance().await;
    assert_eq!(fx.session.snapshot().state, RoomState::Break);
    assert_eq!(fx.log.lock().unwrap().finalized, 0);
    fx.session.tick().await;
    fx.session.tick().await;

    // Part 2 (no prep configured on this question).
    fx.session.press_play().await;
    fx.session.tick().await;
    fx.session.advance().await;
    fx.session.tick().await;
    fx.session.tick().await;

    // Part 3, then the whole test goes out as one submission.
    fx.session.press_play().await;
    fx.session.tick().await;
    fx.session.advance().await;

    let snap = fx.session.snapshot();
    assert!(snap.complete);
    assert!(snap.feedback.is_some());

    let log = fx.log.lock().unwrap();
    assert_eq!(log.created, 1, "one handle spans the whole test");
    assert_eq!(log.finalized, 1);

    let seen = fx.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(count_question_fields(&seen[0]), 3);

    Ok(())
}

#[tokio::test]
async fn failed_submission_surfaces_alert_and_no_feedback() -> Result<()> {
    let questions = vec![question("q1", Part::Two, 0, 1)];
    let mut fx = fixture(
        Mode::Practice,
        questions,
        StatusCode::INTERNAL_SERVER_ERROR,
        None,
    )
    .await;

    fx.session.press_play().await;
    fx.session.tick().await;
    fx.session.advance().await;

    let snap = fx.session.snapshot();
    assert!(snap.complete);
    assert!(snap.feedback.is_none());
    assert_eq!(snap.scoring_status, Some(ScoringStatus::Error));
    assert!(snap.alert.is_some());

    Ok(())
}

#[tokio::test]
async fn denied_capture_halts_the_room() -> Result<()> {
    let recordings = TempDir::new().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let url = spawn_scorer(StatusCode::OK, feedback_json(), Arc::clone(&seen)).await;

    let config = SessionConfig {
        mode: Mode::Practice,
        recordings_dir: recordings.path().to_path_buf(),
        ..SessionConfig::default()
    };
    let deps = SessionDeps {
        recorder_factory: Arc::new(DeniedFactory),
        cue_player: Arc::new(InstantCue),
        scoring: Arc::new(ScoringClient::new(url)),
        history: None,
    };

    let mut session =
        SpeakingSession::new(config, vec![question("q1", Part::One, 0, 5)], deps);

    session.press_play().await;

    let snap = session.snapshot();
    assert!(snap.halted);
    assert!(snap.alert.is_some());
    assert!(snap.countdown.is_none());

    // No retry: further input is ignored.
    session.press_play().await;
    session.tick().await;
    assert!(session.snapshot().halted);
    assert!(seen.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn shutdown_releases_the_recorder_without_errors() -> Result<()> {
    let questions = vec![question("q1", Part::One, 0, 10)];
    let mut fx = fixture(Mode::Practice, questions, StatusCode::OK, None).await;

    fx.session.press_play().await;
    assert_eq!(fx.session.snapshot().state, RoomState::Recording);

    // Leaving the room mid-recording must not fail, and a second shutdown
    // on the already-released device is a no-op.
    fx.session.shutdown();
    fx.session.shutdown();

    Ok(())
}
