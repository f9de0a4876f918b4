pub mod cache;
pub mod rest;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::FieldMap;

/// One row as returned by the data store, column name to raw JSON value.
pub type RawRow = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("data source is not configured: {0} is empty")]
    NotConfigured(&'static str),
    #[error("failed building HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {preview}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        preview: String,
    },
    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Yields the most recent row of the monitored table, or `None` when the
/// table is empty.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn latest(&self) -> Result<Option<RawRow>, SnapshotError>;
}

#[async_trait]
impl<S: SnapshotSource + ?Sized> SnapshotSource for std::sync::Arc<S> {
    async fn latest(&self) -> Result<Option<RawRow>, SnapshotError> {
        (**self).latest().await
    }
}

/// The KPI fields of a snapshot row, still unformatted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub campaign_status: Option<Value>,
    pub mailing_count: Option<Value>,
    pub average_ticket: Option<Value>,
    pub lead_count: Option<Value>,
    pub call_count: Option<Value>,
    pub last_lead_at: Option<Value>,
    pub consumed_value: Option<Value>,
    pub created_at: Option<Value>,
}

impl Snapshot {
    pub fn from_row(row: &RawRow, fields: &FieldMap) -> Self {
        let pick = |column: &str| {
            column_value(row, column)
                .filter(|v| !v.is_null())
                .cloned()
        };
        Self {
            campaign_status: pick(&fields.campaign_status),
            mailing_count: pick(&fields.mailing_count),
            average_ticket: pick(&fields.average_ticket),
            lead_count: pick(&fields.lead_count),
            call_count: pick(&fields.call_count),
            last_lead_at: pick(&fields.last_lead_at),
            consumed_value: pick(&fields.consumed_value),
            created_at: pick(&fields.created_at),
        }
    }
}

fn column_value<'a>(row: &'a RawRow, column: &str) -> Option<&'a Value> {
    row.get(column).or_else(|| {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RawRow, Snapshot};
    use crate::config::FieldMap;

    fn row(value: serde_json::Value) -> RawRow {
        value.as_object().cloned().expect("object row")
    }

    #[test]
    fn maps_default_columns() {
        let raw = row(json!({
            "st_campanhas_rpo": "ATIVA",
            "qtde_mailing_rpo": 1500,
            "ticket_medio_rpo": 87.5,
            "qtde_lead_rpo": 42,
            "qtde_chamadas_rpo": 980,
            "ultimo_lead_rpo": "2024-01-15T11:58:00Z",
            "valor_consumido_rpo": 320.1,
            "created_at": "2024-01-15T12:00:00Z"
        }));
        let snapshot = Snapshot::from_row(&raw, &FieldMap::default());
        assert_eq!(snapshot.campaign_status, Some(json!("ATIVA")));
        assert_eq!(snapshot.lead_count, Some(json!(42)));
        assert_eq!(snapshot.created_at, Some(json!("2024-01-15T12:00:00Z")));
    }

    #[test]
    fn nulls_and_missing_columns_become_none() {
        let raw = row(json!({ "created_at": "2024-01-15T12:00:00Z", "qtde_lead_rpo": null }));
        let snapshot = Snapshot::from_row(&raw, &FieldMap::default());
        assert_eq!(snapshot.lead_count, None);
        assert_eq!(snapshot.mailing_count, None);
        assert!(snapshot.created_at.is_some());
    }

    #[test]
    fn column_lookup_honours_mapping_and_ignores_case() {
        let raw = row(json!({ "CREATE AT": "2024-01-15T12:00:00Z", "Qtde_Lead_RPO": 7 }));
        let fields = FieldMap {
            created_at: "create at".to_string(),
            ..FieldMap::default()
        };
        let snapshot = Snapshot::from_row(&raw, &fields);
        assert_eq!(snapshot.created_at, Some(json!("2024-01-15T12:00:00Z")));
        assert_eq!(snapshot.lead_count, Some(json!(7)));
    }
}
