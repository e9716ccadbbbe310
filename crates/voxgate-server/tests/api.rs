//! Router-level tests with in-memory backends and stub providers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use voxgate_core::chat::{ConversationEngine, ConversationReply};
use voxgate_core::clock::{Clock, SystemClock};
use voxgate_core::speech::{SpeechSynthesizer, SynthesizedSpeech};
use voxgate_core::storage::memory::{MemoryBlobStore, MemoryHistoryBackend};
use voxgate_core::storage::{ConversationArchive, ConversationHistory};
use voxgate_core::transcribe::{JobSpec, JobStatus, Transcriber, TranscriptionJobs};
use voxgate_core::{Error, Result};
use voxgate_server::api::create_router;
use voxgate_server::state::AppState;

const MP3_BYTES: &[u8] = b"pretend mp3 audio";
const TRANSCRIPT: &str = "I would like to book a cleaning";

struct EchoEngine;

#[async_trait]
impl ConversationEngine for EchoEngine {
    async fn send(&self, _session_id: &str, text: &str) -> Result<ConversationReply> {
        Ok(ConversationReply {
            text: format!("You said: {text}"),
            intent: Some("BookAppointment".into()),
            slots: None,
            session_state: None,
        })
    }
}

struct DeniedEngine;

#[async_trait]
impl ConversationEngine for DeniedEngine {
    async fn send(&self, _session_id: &str, _text: &str) -> Result<ConversationReply> {
        Err(Error::AccessDenied("intent engine: 403 forbidden".into()))
    }
}

struct FixedSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FixedSynthesizer {
    async fn synthesize(&self, _text: &str, voice: &str) -> Result<SynthesizedSpeech> {
        Ok(SynthesizedSpeech {
            audio_base64: BASE64_STANDARD.encode(MP3_BYTES),
            format: "mp3".into(),
            voice: voice.into(),
        })
    }
}

struct BrokenSynthesizer;

#[async_trait]
impl SpeechSynthesizer for BrokenSynthesizer {
    async fn synthesize(&self, _text: &str, _voice: &str) -> Result<SynthesizedSpeech> {
        Err(Error::Provider(
            "speech synthesis: no audio stream in response".into(),
        ))
    }
}

/// Transcription service whose jobs complete on the first status check.
#[derive(Default)]
struct InstantJobs {
    started: AtomicU32,
    status_calls: AtomicU32,
}

#[async_trait]
impl TranscriptionJobs for InstantJobs {
    async fn start_job(&self, _spec: &JobSpec) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn job_status(&self, _name: &str) -> Result<JobStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(JobStatus::Completed {
            transcript_uri: "https://results.example/doc.json".into(),
        })
    }

    async fn delete_job(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn fetch_transcript(&self, _uri: &str) -> Result<Value> {
        Ok(json!({"results": {"transcripts": [{"transcript": TRANSCRIPT}]}}))
    }
}

struct TestApp {
    router: Router,
    history: Arc<ConversationHistory>,
    blobs: Arc<MemoryBlobStore>,
    jobs: Arc<InstantJobs>,
}

fn test_app_with_engine(engine: Option<Arc<dyn ConversationEngine>>) -> TestApp {
    test_app_with(engine, Arc::new(FixedSynthesizer))
}

fn test_app_with(
    engine: Option<Arc<dyn ConversationEngine>>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
) -> TestApp {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let blobs = Arc::new(MemoryBlobStore::new());
    let jobs = Arc::new(InstantJobs::default());
    let history = Arc::new(ConversationHistory::new(
        Arc::new(MemoryHistoryBackend::new()),
        clock.clone(),
        "chat-history",
    ));

    let state = AppState {
        conversation: engine,
        synthesizer,
        transcriber: Arc::new(Transcriber::new(
            blobs.clone(),
            jobs.clone(),
            clock.clone(),
            "recordings",
        )),
        history: history.clone(),
        archive: Arc::new(ConversationArchive::new(
            blobs.clone(),
            clock,
            "conversations",
        )),
        default_voice: "Joanna".into(),
    };

    TestApp {
        router: create_router(state),
        history,
        blobs,
        jobs,
    }
}

fn test_app() -> TestApp {
    test_app_with_engine(Some(Arc::new(EchoEngine)))
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let resp = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(resp).await
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(resp).await
}

async fn read_json(resp: axum::response::Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn index_lists_the_endpoints() {
    let app = test_app();
    let (status, body) = get(&app.router, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let endpoints = body["endpoints"].as_array().unwrap();
    assert!(endpoints.contains(&json!("/chat")));
    assert!(endpoints.contains(&json!("/transcribe")));
}

#[tokio::test]
async fn health_reports_healthy_with_timestamp() {
    let app = test_app();
    let (status, body) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(!body["timestamp"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn chat_generates_a_session_id_and_stores_the_exchange() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/chat",
        json!({"message": "I have a toothache"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(!body["text"].as_str().unwrap().is_empty());
    assert_eq!(body["intent"], "BookAppointment");

    let session_id = body["session_id"].as_str().unwrap();
    Uuid::parse_str(session_id).expect("generated session id should be a UUID");

    let exchanges = app.history.read(session_id, 10).await;
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].message, "I have a toothache");
    assert_eq!(exchanges[0].response, body["text"].as_str().unwrap());
}

#[tokio::test]
async fn chat_keeps_the_callers_session_id() {
    let app = test_app();
    let (_, first) = post_json(
        &app.router,
        "/chat",
        json!({"message": "hello", "session_id": "s-42"}),
    )
    .await;
    let (_, second) = post_json(
        &app.router,
        "/chat",
        json!({"message": "again", "session_id": "s-42"}),
    )
    .await;

    assert_eq!(first["session_id"], "s-42");
    assert_eq!(second["session_id"], "s-42");
    assert_eq!(app.history.read("s-42", 10).await.len(), 2);
}

#[tokio::test]
async fn chat_missing_message_is_a_client_error() {
    let app = test_app();
    let (status, body) = post_json(&app.router, "/chat", json!({"session_id": "s-1"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert_eq!(body["text"], "Missing message parameter");
}

#[tokio::test]
async fn chat_without_engine_is_a_soft_error() {
    let app = test_app_with_engine(None);
    let (status, body) = post_json(&app.router, "/chat", json!({"message": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    // Same wording as every other unavailable component.
    assert_eq!(
        body["text"],
        Error::Unavailable(String::new()).user_message()
    );
}

#[tokio::test]
async fn chat_engine_failure_is_sanitized_and_not_stored() {
    let app = test_app_with_engine(Some(Arc::new(DeniedEngine)));
    let (status, body) = post_json(
        &app.router,
        "/chat",
        json!({"message": "hello", "session_id": "s-denied"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");
    // The provider detail stays in the logs.
    assert!(!body["text"].as_str().unwrap().contains("403"));
    assert!(app.history.read("s-denied", 10).await.is_empty());
}

#[tokio::test]
async fn chat_health_reflects_engine_configuration() {
    let configured = test_app();
    let (_, body) = get(&configured.router, "/chat/health").await;
    assert_eq!(body["status"], "ok");

    let unconfigured = test_app_with_engine(None);
    let (_, body) = get(&unconfigured.router, "/chat/health").await;
    assert_eq!(body["status"], "warning");
}

#[tokio::test]
async fn speech_returns_decodable_audio() {
    let app = test_app();
    let (status, body) = post_json(&app.router, "/speech", json!({"text": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["format"], "mp3");
    assert_eq!(body["voice"], "Joanna");
    let audio = BASE64_STANDARD
        .decode(body["audio"].as_str().unwrap())
        .unwrap();
    assert!(!audio.is_empty());
}

#[tokio::test]
async fn speech_honors_the_requested_voice() {
    let app = test_app();
    let (_, body) = post_json(
        &app.router,
        "/speech",
        json!({"text": "hello", "voice": "Matthew"}),
    )
    .await;
    assert_eq!(body["voice"], "Matthew");
}

#[tokio::test]
async fn speech_failure_reports_an_error_and_no_audio() {
    let app = test_app_with(Some(Arc::new(EchoEngine)), Arc::new(BrokenSynthesizer));
    let (status, body) = post_json(&app.router, "/speech", json!({"text": "hello"})).await;

    // Soft failure: JSON error body with no audio payload at all.
    assert_eq!(status, StatusCode::OK);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert!(body.as_object().unwrap().get("audio").is_none());
    // The provider detail stays in the logs.
    assert!(!body["error"].as_str().unwrap().contains("audio stream"));
}

#[tokio::test]
async fn speech_missing_text_is_a_client_error() {
    let app = test_app();
    let (status, body) = post_json(&app.router, "/speech", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing text parameter");
}

#[tokio::test]
async fn transcribe_returns_the_transcript() {
    let app = test_app();
    let audio = BASE64_STANDARD.encode(b"webm audio bytes");
    let (status, body) = post_json(&app.router, "/transcribe", json!({"audio": audio})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], TRANSCRIPT);
    assert_eq!(app.jobs.started.load(Ordering::SeqCst), 1);
    // Staged audio is cleaned up after the transcript is fetched.
    assert_eq!(app.blobs.object_count("recordings").await, 0);
}

#[tokio::test]
async fn transcribe_invalid_base64_touches_no_providers() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/transcribe",
        json!({"audio": "@@not base64@@"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid audio data"));
    assert_eq!(app.jobs.started.load(Ordering::SeqCst), 0);
    assert_eq!(app.jobs.status_calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.blobs.object_count("recordings").await, 0);
}

#[tokio::test]
async fn transcribe_missing_audio_is_a_client_error() {
    let app = test_app();
    let (status, body) = post_json(&app.router, "/transcribe", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing audio parameter");
}

#[tokio::test]
async fn save_conversation_writes_one_object_per_call() {
    let app = test_app();
    let messages = json!([{"role": "user", "content": "hello"}]);

    let (status, body) = post_json(
        &app.router,
        "/save-conversation",
        json!({"session_id": "s-1", "messages": messages.clone()}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = post_json(
        &app.router,
        "/save-conversation",
        json!({"session_id": "s-2", "messages": messages}),
    )
    .await;
    assert_eq!(body["success"], true);

    assert_eq!(app.blobs.object_count("conversations").await, 2);
}

#[tokio::test]
async fn save_conversation_missing_fields_is_a_client_error() {
    let app = test_app();
    let (status, body) = post_json(
        &app.router,
        "/save-conversation",
        json!({"session_id": "s-1"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required parameters");
}
