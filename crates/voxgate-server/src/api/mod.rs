//! API routes and handlers

mod chat;
mod conversation;
mod health;
mod speech;
mod transcribe;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health_check))
        .route("/chat", post(chat::chat))
        .route("/chat/health", get(chat::chat_health))
        .route("/speech", post(speech::synthesize))
        .route("/transcribe", post(transcribe::transcribe))
        .route("/save-conversation", post(conversation::save_conversation))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
