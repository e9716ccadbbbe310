//! Speech synthesis endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

pub async fn synthesize(
    State(state): State<AppState>,
    body: Result<Json<SpeechRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Ok(Json(req)) = body else {
        return Err(ApiError::bad_request("Missing request body"));
    };
    let text = req
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing text parameter"))?;
    let voice = req.voice.unwrap_or_else(|| state.default_voice.clone());

    info!(voice, chars = text.len(), "converting text to speech");

    match state.synthesizer.synthesize(&text, &voice).await {
        Ok(speech) => Ok(Json(json!({
            "audio": speech.audio_base64,
            "format": speech.format,
            "voice": speech.voice
        }))
        .into_response()),
        Err(err) => {
            error!(error = %err, "speech synthesis failed");
            // Soft failure: JSON error body, no audio field.
            Ok(Json(json!({ "error": err.user_message() })).into_response())
        }
    }
}
