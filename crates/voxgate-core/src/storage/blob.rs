//! Blob store client, shared by transcription staging and the archive store.

use async_trait::async_trait;
use tracing::info;

use crate::error::{response_failure, Result};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the bucket if it does not exist. Idempotent.
    async fn ensure_bucket(&self, bucket: &str) -> Result<()>;
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Reqwest-backed client for the managed blob store.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpBlobStore {
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

    fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/{}", self.base_url, bucket)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, key)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        let resp = self
            .client
            .head(self.bucket_url(bucket))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if resp.status().is_success() {
            return Ok(());
        }
        if resp.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(response_failure("blob store: check bucket", resp).await);
        }

        info!(bucket, "creating blob bucket");
        let resp = self
            .client
            .put(self.bucket_url(bucket))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("blob store: create bucket", resp).await);
        }
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let resp = self
            .client
            .put(self.object_url(bucket, key))
            .header("x-api-key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("blob store: put object", resp).await);
        }
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.object_url(bucket, key))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("blob store: delete object", resp).await);
        }
        Ok(())
    }
}
