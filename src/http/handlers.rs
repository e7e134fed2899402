use super::state::{AppState, RoomHandle};
use crate::chat::ChatMode;
use crate::question::Mode;
use crate::session::{RoomSnapshot, SessionConfig, SessionDeps, SpeakingSession};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartRoomRequest {
    pub mode: Mode,

    /// Required in practice mode; ignored for full tests.
    pub topic_id: Option<String>,

    /// Signed-in user, when feedback should be kept in history.
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartRoomResponse {
    pub room_id: String,
    pub status: String,
    pub question_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /rooms/start
/// Open a room for a mode and topic.
pub async fn start_room(
    State(state): State<AppState>,
    Json(req): Json<StartRoomRequest>,
) -> impl IntoResponse {
    let questions = match req.mode {
        Mode::Test => state.bank.full_test(),
        Mode::Practice => match &req.topic_id {
            Some(topic_id) => state.bank.questions_for_topic(topic_id),
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "practice mode requires a topic_id".to_string(),
                    }),
                )
                    .into_response();
            }
        },
    };

    // An empty question list never reaches the state machine.
    if questions.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no questions found for the requested session".to_string(),
            }),
        )
            .into_response();
    }

    let room_id = format!("room-{}", uuid::Uuid::new_v4());

    let config = SessionConfig {
        mode: req.mode,
        topic_id: req.topic_id.clone(),
        user_id: req.user_id.clone(),
        break_secs: state.config.session.break_secs,
        success_hold_secs: state.config.session.success_hold_secs,
        recordings_dir: state.config.audio.recordings_path.clone().into(),
    };

    let deps = SessionDeps {
        recorder_factory: Arc::clone(&state.recorder_factory),
        cue_player: Arc::clone(&state.cue_player),
        scoring: Arc::clone(&state.scoring),
        history: Some(Arc::clone(&state.history)),
    };

    let question_count = questions.len();
    let session = SpeakingSession::new(config, questions, deps);
    let handle = RoomHandle::spawn(session);

    {
        let mut rooms = state.rooms.write().await;
        rooms.insert(room_id.clone(), handle);
    }

    info!("Room started: {room_id} ({question_count} questions)");

    (
        StatusCode::OK,
        Json(StartRoomResponse {
            room_id,
            status: "idle".to_string(),
            question_count,
        }),
    )
        .into_response()
}

/// POST /rooms/:room_id/play
pub async fn press_play(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    with_room(&state, &room_id, |handle| async move {
        let mut session = handle.session.lock().await;
        session.press_play().await;
        session.snapshot()
    })
    .await
}

/// POST /rooms/:room_id/skip-preparation
pub async fn skip_preparation(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    with_room(&state, &room_id, |handle| async move {
        let mut session = handle.session.lock().await;
        session.skip_preparation().await;
        session.snapshot()
    })
    .await
}

/// POST /rooms/:room_id/skip
pub async fn skip_to_next(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    with_room(&state, &room_id, |handle| async move {
        let mut session = handle.session.lock().await;
        session.skip_to_next().await;
        session.snapshot()
    })
    .await
}

/// POST /rooms/:room_id/next
pub async fn advance(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    with_room(&state, &room_id, |handle| async move {
        let mut session = handle.session.lock().await;
        session.advance().await;
        session.snapshot()
    })
    .await
}

/// GET /rooms/:room_id/status
pub async fn get_room_status(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    with_room(&state, &room_id, |handle| async move {
        handle.session.lock().await.snapshot()
    })
    .await
}

/// DELETE /rooms/:room_id
/// Leave the room: stop playback, release the recorder, drop the session.
pub async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> impl IntoResponse {
    let handle = {
        let mut rooms = state.rooms.write().await;
        rooms.remove(&room_id)
    };

    match handle {
        Some(handle) => {
            handle.close().await;
            info!("Room closed: {room_id}");
            StatusCode::NO_CONTENT.into_response()
        }
        None => {
            error!("Room {room_id} not found");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Room {room_id} not found"),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub mode: ChatMode,
    pub message: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

/// POST /chat
/// Single-answer chat completion; backend failures come back as a canned
/// local answer, never an error.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let answer = state
        .chat
        .ask_or_fallback(req.mode, &req.message, req.conversation_id.as_deref())
        .await;

    (StatusCode::OK, Json(ChatResponse { answer }))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Look a room up and run `f` against it; 404 when it does not exist.
async fn with_room<F, Fut>(state: &AppState, room_id: &str, f: F) -> axum::response::Response
where
    F: FnOnce(Arc<RoomHandle>) -> Fut,
    Fut: std::future::Future<Output = RoomSnapshot>,
{
    let handle = {
        let rooms = state.rooms.read().await;
        rooms.get(room_id).cloned()
    };

    match handle {
        Some(handle) => {
            let snapshot = f(handle).await;
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Room {room_id} not found"),
            }),
        )
            .into_response(),
    }
}
