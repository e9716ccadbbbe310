//! Speech recognition orchestrator.
//!
//! The only multi-step workflow in the system: decode the caller's audio,
//! stage it in the blob store, submit an asynchronous transcription job, poll
//! to a terminal state under a fixed bound, fetch the transcript document,
//! and clean up best-effort. Every step is single-attempt except the bounded
//! poll; sleeping goes through the [`Clock`] seam so the loop is testable
//! without wall-clock delay.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{response_failure, Error, Result};
use crate::storage::blob::BlobStore;

pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const MAX_POLL_ATTEMPTS: u32 = 30;

const LANGUAGE_CODE: &str = "en-US";
const STAGING_PREFIX: &str = "temp-recordings";
const DEFAULT_MEDIA_FORMAT: &str = "webm";

/// Submission parameters for one transcription job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSpec {
    pub name: String,
    pub media_uri: String,
    pub media_format: String,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Completed { transcript_uri: String },
    Failed { reason: String },
}

#[async_trait]
pub trait TranscriptionJobs: Send + Sync {
    async fn start_job(&self, spec: &JobSpec) -> Result<()>;
    async fn job_status(&self, name: &str) -> Result<JobStatus>;
    async fn delete_job(&self, name: &str) -> Result<()>;
    /// Fetch the transcript document from the job's result location. The URI
    /// is pre-signed by the provider; no credentials are attached.
    async fn fetch_transcript(&self, uri: &str) -> Result<Value>;
}

pub struct Transcriber {
    blobs: Arc<dyn BlobStore>,
    jobs: Arc<dyn TranscriptionJobs>,
    clock: Arc<dyn Clock>,
    staging_bucket: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
    provisioned: OnceCell<()>,
}

impl Transcriber {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn TranscriptionJobs>,
        clock: Arc<dyn Clock>,
        staging_bucket: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            jobs,
            clock,
            staging_bucket: staging_bucket.into(),
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: MAX_POLL_ATTEMPTS,
            provisioned: OnceCell::new(),
        }
    }

    /// Override the poll bound. Used by tests; production keeps the
    /// 30 x 2 s ceiling.
    pub fn with_poll_policy(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    /// Run the full transcription workflow and return the transcript text.
    pub async fn transcribe(&self, audio_base64: &str, content_type: &str) -> Result<String> {
        // Decode before touching any provider so bad input costs nothing.
        if audio_base64.trim().is_empty() {
            return Err(Error::InvalidInput("Missing audio parameter".into()));
        }
        let audio = BASE64_STANDARD
            .decode(audio_base64.trim())
            .map_err(|err| Error::InvalidInput(format!("Invalid audio data: {err}")))?;
        debug!(bytes = audio.len(), "decoded staged audio");

        self.provisioned
            .get_or_try_init(|| self.blobs.ensure_bucket(&self.staging_bucket))
            .await?;

        let media_format = media_format_for(content_type);
        let object_key = format!("{STAGING_PREFIX}/{}.{media_format}", Uuid::new_v4());
        self.blobs
            .put_object(&self.staging_bucket, &object_key, audio, content_type)
            .await?;

        let spec = JobSpec {
            name: format!("transcribe-{}", Uuid::new_v4()),
            media_uri: format!("blob://{}/{}", self.staging_bucket, object_key),
            media_format: media_format.to_string(),
            language_code: LANGUAGE_CODE.to_string(),
        };
        info!(job = %spec.name, "starting transcription job");
        self.jobs.start_job(&spec).await?;

        let outcome = self.poll_to_completion(&spec.name).await?;
        let text = match outcome {
            JobStatus::Completed { transcript_uri } => {
                let doc = self.jobs.fetch_transcript(&transcript_uri).await?;
                extract_transcript(&doc)?
            }
            JobStatus::Failed { reason } => {
                return Err(Error::Provider(format!("transcription job failed: {reason}")));
            }
            JobStatus::InProgress => unreachable!("poll loop only returns terminal states"),
        };

        self.cleanup(&spec.name, &object_key).await;
        Ok(text)
    }

    /// Query status every `poll_interval` up to `max_poll_attempts` times.
    /// Any status-check error is fatal; exhaustion is a timeout.
    async fn poll_to_completion(&self, job_name: &str) -> Result<JobStatus> {
        for attempt in 1..=self.max_poll_attempts {
            match self.jobs.job_status(job_name).await? {
                JobStatus::InProgress => {
                    debug!(job = job_name, attempt, "transcription still in progress");
                    if attempt < self.max_poll_attempts {
                        self.clock.sleep(self.poll_interval).await;
                    }
                }
                terminal => return Ok(terminal),
            }
        }
        Err(Error::Timeout(format!(
            "transcription job {job_name} still in progress after {} status checks",
            self.max_poll_attempts
        )))
    }

    /// Delete the job and the staged object. Failures are logged, never
    /// surfaced: the transcript is already in hand.
    async fn cleanup(&self, job_name: &str, object_key: &str) {
        if let Err(err) = self.jobs.delete_job(job_name).await {
            warn!(job = job_name, error = %err, "failed to delete transcription job");
        }
        if let Err(err) = self
            .blobs
            .delete_object(&self.staging_bucket, object_key)
            .await
        {
            warn!(key = object_key, error = %err, "failed to delete staged audio");
        }
    }
}

/// Media format from the request content type: the subtype, with any
/// parameters stripped. `audio/webm;codecs=opus` -> `webm`.
fn media_format_for(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .and_then(|mime| mime.split('/').nth(1))
        .map(str::trim)
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or(DEFAULT_MEDIA_FORMAT)
}

/// First transcript string out of the provider's result document.
fn extract_transcript(doc: &Value) -> Result<String> {
    doc.pointer("/results/transcripts/0/transcript")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::Provider("malformed transcript document".into()))
}

/// Reqwest-backed client for the managed transcription service.
pub struct HttpTranscriptionService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTranscriptionService {
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

    fn job_url(&self, name: &str) -> String {
        format!("{}/v1/jobs/{}", self.base_url, name)
    }
}

#[derive(Debug, Deserialize)]
struct JobDescription {
    status: String,
    transcript_uri: Option<String>,
    failure_reason: Option<String>,
}

#[async_trait]
impl TranscriptionJobs for HttpTranscriptionService {
    async fn start_job(&self, spec: &JobSpec) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/v1/jobs", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(spec)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("transcription: start job", resp).await);
        }
        Ok(())
    }

    async fn job_status(&self, name: &str) -> Result<JobStatus> {
        let resp = self
            .client
            .get(self.job_url(name))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("transcription: job status", resp).await);
        }

        let description: JobDescription = resp.json().await?;
        match description.status.as_str() {
            "COMPLETED" => {
                let transcript_uri = description.transcript_uri.ok_or_else(|| {
                    Error::Provider("transcription: completed job without transcript uri".into())
                })?;
                Ok(JobStatus::Completed { transcript_uri })
            }
            "FAILED" => Ok(JobStatus::Failed {
                reason: description
                    .failure_reason
                    .unwrap_or_else(|| "unknown reason".into()),
            }),
            "IN_PROGRESS" | "QUEUED" => Ok(JobStatus::InProgress),
            other => Err(Error::Provider(format!(
                "transcription: unknown job status {other}"
            ))),
        }
    }

    async fn delete_job(&self, name: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.job_url(name))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("transcription: delete job", resp).await);
        }
        Ok(())
    }

    async fn fetch_transcript(&self, uri: &str) -> Result<Value> {
        let resp = self.client.get(uri).send().await?;
        if !resp.status().is_success() {
            return Err(response_failure("transcription: fetch transcript", resp).await);
        }
        Ok(resp.json().await?)
    }
}
