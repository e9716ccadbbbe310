//! Transcription endpoint over the recognition orchestrator.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};
use voxgate_core::Error;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_CONTENT_TYPE: &str = "audio/webm";

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

pub async fn transcribe(
    State(state): State<AppState>,
    body: Result<Json<TranscribeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Ok(Json(req)) = body else {
        return Err(ApiError::bad_request("Missing request body"));
    };
    let audio = req
        .audio
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing audio parameter"))?;
    let content_type = req.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);

    info!(content_type, "received audio for transcription");

    match state.transcriber.transcribe(&audio, content_type).await {
        Ok(text) => Ok(Json(json!({ "text": text })).into_response()),
        Err(err @ Error::InvalidInput(_)) => Err(ApiError::from(err)),
        Err(err @ (Error::Timeout(_) | Error::Provider(_))) => {
            // Job failure reasons and the poll timeout are surfaced as-is;
            // this route is the one sanctioned case.
            error!(error = %err, "transcription failed");
            Ok(Json(json!({ "error": err.to_string() })).into_response())
        }
        Err(err) => {
            error!(error = %err, "transcription failed");
            Ok(Json(json!({ "error": err.user_message() })).into_response())
        }
    }
}
