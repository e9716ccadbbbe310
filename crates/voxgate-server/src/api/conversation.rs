//! Conversation archive endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveConversationRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
}

pub async fn save_conversation(
    State(state): State<AppState>,
    body: Result<Json<SaveConversationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Ok(Json(req)) = body else {
        return Err(ApiError::bad_request("Missing request body"));
    };
    let (session_id, messages) = match (req.session_id, req.messages) {
        (Some(session_id), Some(messages)) if !session_id.is_empty() && !messages.is_empty() => {
            (session_id, messages)
        }
        _ => return Err(ApiError::bad_request("Missing required parameters")),
    };

    info!(%session_id, count = messages.len(), "saving conversation");

    match state.archive.archive(&session_id, &messages).await {
        Ok(_key) => Ok(Json(json!({ "success": true })).into_response()),
        Err(err) => {
            error!(%session_id, error = %err, "failed to store conversation");
            Ok(Json(json!({ "success": false, "error": err.user_message() })).into_response())
        }
    }
}
