use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Room lifecycle
        .route("/rooms/start", post(handlers::start_room))
        .route("/rooms/:room_id", delete(handlers::leave_room))
        // Room controls
        .route("/rooms/:room_id/play", post(handlers::press_play))
        .route(
            "/rooms/:room_id/skip-preparation",
            post(handlers::skip_preparation),
        )
        .route("/rooms/:room_id/skip", post(handlers::skip_to_next))
        .route("/rooms/:room_id/next", post(handlers::advance))
        // Room queries
        .route("/rooms/:room_id/status", get(handlers::get_room_status))
        // Chatbot relay
        .route("/chat", post(handlers::chat))
        // Request logging + permissive CORS for the app shell
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
