pub mod audio;
pub mod chat;
pub mod config;
pub mod history;
pub mod http;
pub mod question;
pub mod scoring;
pub mod session;

pub use audio::{
    AudioFile, CuePlayer, MicRecorder, MicRecorderFactory, Recorder, RecorderError,
    RecorderFactory,
};
pub use chat::{ChatClient, ChatError, ChatMode};
pub use config::Config;
pub use history::{HistoryRecord, HistoryStore};
pub use http::{create_router, AppState};
pub use question::{Mode, Part, Question, QuestionBank, Topic};
pub use scoring::{CriterionFeedback, Feedback, FeedbackDetails, ScoringClient, ScoringError};
pub use session::{
    Countdown, CountdownKind, RoomAction, RoomEvent, RoomMachine, RoomSnapshot, RoomState,
    ScoringStatus, SessionConfig, SessionDeps, SpeakingSession,
};
