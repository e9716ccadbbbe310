//! Per-session conversation history on the managed key-value store.
//!
//! The backing table is provisioned lazily on first use: existence check,
//! create with a composite key of session id plus timestamp, then a bounded
//! wait until the store reports the table active. Reads are non-fatal to
//! callers and degrade to an empty history.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{response_failure, Error, Result};

const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const READY_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_INTENT: &str = "unknown";

/// One user message paired with the assistant's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub session_id: String,
    /// RFC 3339 UTC timestamp; the table's range key, so exchanges sort
    /// chronologically within a session.
    pub timestamp: String,
    pub message: String,
    pub response: String,
    pub intent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Missing,
    Creating,
    Active,
}

#[async_trait]
pub trait HistoryBackend: Send + Sync {
    async fn table_state(&self, table: &str) -> Result<TableState>;
    /// Create the table with a (session_id, timestamp) composite key.
    async fn create_table(&self, table: &str) -> Result<()>;
    async fn put_exchange(&self, table: &str, exchange: &Exchange) -> Result<()>;
    /// At most `limit` exchanges for the session, oldest first.
    async fn query(&self, table: &str, session_id: &str, limit: usize) -> Result<Vec<Exchange>>;
}

pub struct ConversationHistory {
    backend: Arc<dyn HistoryBackend>,
    clock: Arc<dyn Clock>,
    table: String,
    provisioned: OnceCell<()>,
}

impl ConversationHistory {
    pub fn new(
        backend: Arc<dyn HistoryBackend>,
        clock: Arc<dyn Clock>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            clock,
            table: table.into(),
            provisioned: OnceCell::new(),
        }
    }

    async fn ensure_table(&self) -> Result<()> {
        self.provisioned
            .get_or_try_init(|| async {
                match self.backend.table_state(&self.table).await? {
                    TableState::Active => Ok(()),
                    TableState::Creating => self.wait_until_active().await,
                    TableState::Missing => {
                        info!(table = %self.table, "creating history table");
                        self.backend.create_table(&self.table).await?;
                        self.wait_until_active().await
                    }
                }
            })
            .await
            .map(|_| ())
    }

    async fn wait_until_active(&self) -> Result<()> {
        for _ in 0..READY_MAX_ATTEMPTS {
            if self.backend.table_state(&self.table).await? == TableState::Active {
                return Ok(());
            }
            self.clock.sleep(READY_POLL_INTERVAL).await;
        }
        Err(Error::Timeout(format!(
            "history table {} not active after {} checks",
            self.table, READY_MAX_ATTEMPTS
        )))
    }

    /// Append one exchange. Timestamped at call time; `intent` defaults to
    /// "unknown".
    pub async fn append(
        &self,
        session_id: &str,
        message: &str,
        response: &str,
        intent: Option<&str>,
    ) -> Result<()> {
        self.ensure_table().await?;
        let exchange = Exchange {
            session_id: session_id.to_string(),
            timestamp: self.clock.now().to_rfc3339(),
            message: message.to_string(),
            response: response.to_string(),
            intent: intent.unwrap_or(DEFAULT_INTENT).to_string(),
        };
        self.backend.put_exchange(&self.table, &exchange).await
    }

    /// Up to `limit` exchanges, oldest first. Failures are logged and
    /// swallowed into an empty history.
    pub async fn read(&self, session_id: &str, limit: usize) -> Vec<Exchange> {
        let result = async {
            self.ensure_table().await?;
            self.backend.query(&self.table, session_id, limit).await
        }
        .await;

        match result {
            Ok(exchanges) => exchanges,
            Err(err) => {
                warn!(%session_id, error = %err, "history read failed");
                Vec::new()
            }
        }
    }
}

/// Reqwest-backed client for the managed key-value store.
pub struct HttpHistoryBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpHistoryBackend {
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

    fn table_url(&self, table: &str) -> String {
        format!("{}/v1/tables/{}", self.base_url, table)
    }
}

#[derive(Debug, Deserialize)]
struct TableDescription {
    status: String,
}

#[derive(Debug, Serialize)]
struct CreateTableRequest<'a> {
    table_name: &'a str,
    hash_key: &'a str,
    range_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    items: Vec<Exchange>,
}

#[async_trait]
impl HistoryBackend for HttpHistoryBackend {
    async fn table_state(&self, table: &str) -> Result<TableState> {
        let resp = self
            .client
            .get(self.table_url(table))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(TableState::Missing);
        }
        if !resp.status().is_success() {
            return Err(response_failure("kv store: describe table", resp).await);
        }

        let description: TableDescription = resp.json().await?;
        match description.status.as_str() {
            "ACTIVE" => Ok(TableState::Active),
            _ => Ok(TableState::Creating),
        }
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/v1/tables", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&CreateTableRequest {
                table_name: table,
                hash_key: "session_id",
                range_key: "timestamp",
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("kv store: create table", resp).await);
        }
        Ok(())
    }

    async fn put_exchange(&self, table: &str, exchange: &Exchange) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/items", self.table_url(table)))
            .header("x-api-key", &self.api_key)
            .json(exchange)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("kv store: put item", resp).await);
        }
        Ok(())
    }

    async fn query(&self, table: &str, session_id: &str, limit: usize) -> Result<Vec<Exchange>> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(format!("{}/items", self.table_url(table)))
            .header("x-api-key", &self.api_key)
            .query(&[
                ("session_id", session_id),
                ("limit", limit.as_str()),
                ("order", "asc"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(response_failure("kv store: query", resp).await);
        }
        let body: QueryResponse = resp.json().await?;
        Ok(body.items)
    }
}
