//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// API error type: `message` is what the caller sees; the loggable detail is
/// emitted where the error is constructed.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<voxgate_core::Error> for ApiError {
    fn from(err: voxgate_core::Error) -> Self {
        error!(error = %err, "request failed");
        match &err {
            voxgate_core::Error::InvalidInput(_) => ApiError::bad_request(err.user_message()),
            _ => ApiError::internal(err.user_message()),
        }
    }
}
