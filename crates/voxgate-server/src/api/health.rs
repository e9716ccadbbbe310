//! Service info and health endpoints.

use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Voxgate API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/chat", "/health", "/speech", "/transcribe", "/save-conversation"]
    }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp_millis().to_string()
    }))
}
