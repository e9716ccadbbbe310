//! Chat endpoints: forward an utterance to the conversation engine, then
//! store the exchange in the history table best-effort.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;
use voxgate_core::Error;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn chat_error(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "text": text, "status": "error" }))).into_response()
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = body else {
        return chat_error(StatusCode::BAD_REQUEST, "Missing request body");
    };

    let message = match req.message.filter(|m| !m.trim().is_empty()) {
        Some(message) => message,
        None => return chat_error(StatusCode::BAD_REQUEST, "Missing message parameter"),
    };

    // Stable for the conversation: the caller's id, or a fresh one it can
    // keep sending back.
    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let Some(engine) = &state.conversation else {
        let err = Error::Unavailable("conversation engine not configured".into());
        warn!(%session_id, error = %err, "chat rejected");
        return chat_error(StatusCode::OK, &err.user_message());
    };

    info!(%session_id, "received chat message");
    let reply = match engine.send(&session_id, &message).await {
        Ok(reply) => reply,
        Err(err) => {
            error!(%session_id, error = %err, "conversation engine call failed");
            return chat_error(StatusCode::OK, &err.user_message());
        }
    };

    if let Err(err) = state
        .history
        .append(&session_id, &message, &reply.text, reply.intent.as_deref())
        .await
    {
        warn!(%session_id, error = %err, "conversation not stored");
    }

    Json(json!({
        "text": reply.text,
        "intent": reply.intent,
        "status": "ok",
        "session_id": session_id
    }))
    .into_response()
}

pub async fn chat_health(State(state): State<AppState>) -> Json<Value> {
    if state.conversation.is_some() {
        Json(json!({ "status": "ok", "message": "Chat service is healthy" }))
    } else {
        Json(json!({ "status": "warning", "message": "Chat service is not configured" }))
    }
}
