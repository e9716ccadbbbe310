//! In-memory storage backends for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::storage::blob::BlobStore;
use crate::storage::history::{Exchange, HistoryBackend, TableState};

/// Blob store held in a nested map of bucket -> key -> bytes.
#[derive(Default)]
pub struct MemoryBlobStore {
    buckets: Mutex<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.buckets
            .lock()
            .await
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    pub async fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .await
            .get(bucket)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        self.buckets
            .lock()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        self.buckets
            .lock()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.buckets.lock().await;
        let removed = buckets
            .get_mut(bucket)
            .and_then(|objects| objects.remove(key));
        match removed {
            Some(_) => Ok(()),
            None => Err(Error::Provider(format!(
                "blob store: no such object {bucket}/{key}"
            ))),
        }
    }
}

/// History backend where created tables become active immediately.
#[derive(Default)]
pub struct MemoryHistoryBackend {
    tables: Mutex<HashMap<String, Vec<Exchange>>>,
}

impl MemoryHistoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryBackend for MemoryHistoryBackend {
    async fn table_state(&self, table: &str) -> Result<TableState> {
        if self.tables.lock().await.contains_key(table) {
            Ok(TableState::Active)
        } else {
            Ok(TableState::Missing)
        }
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        self.tables
            .lock()
            .await
            .entry(table.to_string())
            .or_default();
        Ok(())
    }

    async fn put_exchange(&self, table: &str, exchange: &Exchange) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| Error::Provider(format!("kv store: no such table {table}")))?;
        rows.push(exchange.clone());
        Ok(())
    }

    async fn query(&self, table: &str, session_id: &str, limit: usize) -> Result<Vec<Exchange>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Exchange> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.session_id == session_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        rows.truncate(limit);
        Ok(rows)
    }
}
