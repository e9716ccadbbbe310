//! Speech synthesis client.
//!
//! The provider streams encoded audio; we drain it fully and hand back
//! base64, since the HTTP surface returns one JSON body.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::debug;

use crate::error::{response_failure, Error, Result};

const OUTPUT_FORMAT: &str = "mp3";

#[derive(Debug, Clone, Serialize)]
pub struct SynthesizedSpeech {
    pub audio_base64: String,
    pub format: String,
    pub voice: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedSpeech>;
}

/// Reqwest-backed client for the managed voice-synthesis service.
pub struct HttpSpeechSynthesizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpSpeechSynthesizer {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    output_format: &'a str,
}

#[async_trait]
impl SpeechSynthesizer for HttpSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<SynthesizedSpeech> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("Missing text parameter".into()));
        }

        debug!(voice, chars = text.len(), "synthesizing speech");
        let resp = self
            .client
            .post(format!("{}/v1/speech", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&SynthesizeRequest {
                text,
                voice_id: voice,
                output_format: OUTPUT_FORMAT,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(response_failure("speech synthesis", resp).await);
        }

        let audio = resp.bytes().await?;
        encode_audio(&audio, voice)
    }
}

/// Package the drained provider bytes. An empty stream is a provider error:
/// the result must carry audio or nothing.
fn encode_audio(audio: &[u8], voice: &str) -> Result<SynthesizedSpeech> {
    if audio.is_empty() {
        return Err(Error::Provider(
            "speech synthesis: no audio stream in response".into(),
        ));
    }
    Ok(SynthesizedSpeech {
        audio_base64: BASE64_STANDARD.encode(audio),
        format: OUTPUT_FORMAT.to_string(),
        voice: voice.to_string(),
    })
}
