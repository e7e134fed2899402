//! HTTP API for driving speaking rooms
//!
//! This is the contract the surrounding app uses:
//! - POST /rooms/start - Open a room for a mode and topic
//! - POST /rooms/:id/play - Press play on the current question
//! - POST /rooms/:id/skip-preparation - Practice: skip part-2 prep
//! - POST /rooms/:id/skip - Practice: skip out of an active recording
//! - POST /rooms/:id/next - Advance from the finished card
//! - GET /rooms/:id/status - Room snapshot (state, countdown, feedback)
//! - DELETE /rooms/:id - Leave the room
//! - POST /chat - Chatbot relay (Dify or Gemini, with canned fallbacks)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, RoomHandle};
