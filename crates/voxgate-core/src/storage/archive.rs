//! Write-once conversation archives in the blob store.
//!
//! Each call produces a new object under a date-partitioned key; nothing is
//! ever appended or overwritten, since the timestamp suffix makes same-day
//! keys for one session distinct.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::info;

use crate::clock::Clock;
use crate::error::Result;
use crate::storage::blob::BlobStore;

#[derive(Debug, Serialize)]
struct ArchiveRecord<'a> {
    session_id: &'a str,
    timestamp: String,
    messages: &'a [Value],
}

pub struct ConversationArchive {
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    bucket: String,
    provisioned: OnceCell<()>,
}

impl ConversationArchive {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            blobs,
            clock,
            bucket: bucket.into(),
            provisioned: OnceCell::new(),
        }
    }

    /// Store the full transcript as one JSON document. Returns the object
    /// key the archive was written under.
    pub async fn archive(&self, session_id: &str, messages: &[Value]) -> Result<String> {
        self.provisioned
            .get_or_try_init(|| self.blobs.ensure_bucket(&self.bucket))
            .await?;

        let now = self.clock.now();
        let key = object_key(session_id, now);
        let record = ArchiveRecord {
            session_id,
            timestamp: now.to_rfc3339(),
            messages,
        };
        let body = serde_json::to_vec_pretty(&record)?;

        self.blobs
            .put_object(&self.bucket, &key, body, "application/json")
            .await?;
        info!(%session_id, key, "conversation archived");
        Ok(key)
    }
}

/// `YYYY/MM/DD/<session>-<YYYYmmdd-HHMMSS>.json`, partitioned by UTC date.
fn object_key(session_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}/{:02}/{:02}/{}-{}.json",
        now.year(),
        now.month(),
        now.day(),
        session_id,
        now.format("%Y%m%d-%H%M%S")
    )
}
