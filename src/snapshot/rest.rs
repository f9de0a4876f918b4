use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::SourceConfig;
use crate::snapshot::{RawRow, SnapshotError, SnapshotSource};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 12;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 6;
const ERROR_PREVIEW_CHARS: usize = 180;

/// Reads the latest row through a PostgREST-style endpoint
/// (`{url}/rest/v1/{table}`), as exposed by Supabase.
#[derive(Debug, Clone)]
pub struct RestSnapshotSource {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    order_column: String,
}

impl RestSnapshotSource {
    pub fn new(source: &SourceConfig) -> Result<Self, SnapshotError> {
        if source.url.trim().is_empty() {
            return Err(SnapshotError::NotConfigured("source.url"));
        }
        if source.table.trim().is_empty() {
            return Err(SnapshotError::NotConfigured("source.table"));
        }
        if source.order_column.trim().is_empty() {
            return Err(SnapshotError::NotConfigured("source.order_column"));
        }
        let client = Client::builder()
            .user_agent(concat!("ops-dashboard/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(SnapshotError::Client)?;
        Ok(Self {
            client,
            base_url: source.url.trim().trim_end_matches('/').to_string(),
            api_key: source.api_key.clone(),
            table: source.table.trim().to_string(),
            order_column: source.order_column.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }
}

#[async_trait]
impl SnapshotSource for RestSnapshotSource {
    async fn latest(&self) -> Result<Option<RawRow>, SnapshotError> {
        let url = self.endpoint();
        let order = format!("{}.desc", self.order_column);
        let mut request = self
            .client
            .get(&url)
            .query(&[("select", "*"), ("order", order.as_str()), ("limit", "1")])
            .header(ACCEPT, "application/json");
        if !self.api_key.is_empty() {
            request = request
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key);
        }

        debug!(table = %self.table, order = %order, "fetching latest snapshot row");
        let response = request
            .send()
            .await
            .map_err(|source| SnapshotError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| SnapshotError::Transport {
                url: url.clone(),
                source,
            })?;
        if !status.is_success() {
            let preview: String = body.chars().take(ERROR_PREVIEW_CHARS).collect();
            return Err(SnapshotError::Status {
                url,
                status,
                preview,
            });
        }
        parse_latest_row(&body).map_err(|reason| SnapshotError::Decode { url, reason })
    }
}

/// Picks the first row out of a PostgREST array body; `[]` and `null` mean
/// the table is empty.
pub fn parse_latest_row(body: &str) -> Result<Option<RawRow>, String> {
    let value: Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {e}"))?;
    match value {
        Value::Null => Ok(None),
        Value::Array(rows) => match rows.into_iter().next() {
            None => Ok(None),
            Some(Value::Object(row)) => Ok(Some(row)),
            Some(other) => Err(format!("expected a row object, found {}", json_kind(&other))),
        },
        other => Err(format!("expected an array of rows, found {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
