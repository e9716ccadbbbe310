//! Shared application state.
//!
//! Components are constructed once from [`Config`] and shared behind `Arc`s.
//! A component whose configuration is incomplete stays `None`; its routes
//! answer with a soft unavailable error instead of crashing the process.

use std::sync::Arc;

use tracing::warn;

use voxgate_core::chat::{ConversationEngine, HttpConversationEngine};
use voxgate_core::clock::{Clock, SystemClock};
use voxgate_core::speech::{HttpSpeechSynthesizer, SpeechSynthesizer};
use voxgate_core::storage::{
    ConversationArchive, ConversationHistory, HttpBlobStore, HttpHistoryBackend,
};
use voxgate_core::transcribe::{HttpTranscriptionService, Transcriber};
use voxgate_core::Config;

#[derive(Clone)]
pub struct AppState {
    pub conversation: Option<Arc<dyn ConversationEngine>>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub transcriber: Arc<Transcriber>,
    pub history: Arc<ConversationHistory>,
    pub archive: Arc<ConversationArchive>,
    pub default_voice: String,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let http = reqwest::Client::new();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let conversation: Option<Arc<dyn ConversationEngine>> = match &config.bot {
            Some(bot) => Some(Arc::new(HttpConversationEngine::new(
                http.clone(),
                config.intent_url.clone(),
                config.api_key.clone(),
                bot.clone(),
            ))),
            None => {
                warn!("conversation engine not configured, /chat will be unavailable");
                None
            }
        };

        let blobs = Arc::new(HttpBlobStore::new(
            http.clone(),
            config.blob_url.clone(),
            config.api_key.clone(),
        ));
        let jobs = Arc::new(HttpTranscriptionService::new(
            http.clone(),
            config.transcribe_url.clone(),
            config.api_key.clone(),
        ));
        let history_backend = Arc::new(HttpHistoryBackend::new(
            http.clone(),
            config.kv_url.clone(),
            config.api_key.clone(),
        ));

        Self {
            conversation,
            synthesizer: Arc::new(HttpSpeechSynthesizer::new(
                http,
                config.speech_url.clone(),
                config.api_key.clone(),
            )),
            transcriber: Arc::new(Transcriber::new(
                blobs.clone(),
                jobs,
                clock.clone(),
                config.staging_bucket.clone(),
            )),
            history: Arc::new(ConversationHistory::new(
                history_backend,
                clock.clone(),
                config.history_table.clone(),
            )),
            archive: Arc::new(ConversationArchive::new(
                blobs,
                clock,
                config.archive_bucket.clone(),
            )),
            default_voice: config.default_voice.clone(),
        }
    }
}
