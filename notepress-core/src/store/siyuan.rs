//! HTTP client for the SiYuan note store API.

use super::{NoteStore, SeedFilter, StoreError};
use crate::row::RawRow;
use async_trait::async_trait;
use notepress_types::NoteId;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Response envelope shared by every API endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ExportedMarkdown {
    content: String,
}

/// Store backed by a running SiYuan instance
pub struct SiyuanStore {
    client: Client,
    base_url: String,
    token: String,
}

impl SiyuanStore {
    /// Create a client for `api_url`; an empty token sends no credential
    pub fn new(api_url: &str, token: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_api_url(api_url),
            token: token.to_string(),
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<Option<T>, StoreError> {
        let url = format!("{}{}", self.base_url, path);

        let mut req = self.client.post(&url).json(&body);
        if !self.token.is_empty() {
            req = req.header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token));
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("{path}: {e}")))?;
        if envelope.code != 0 {
            return Err(StoreError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        Ok(envelope.data)
    }

    async fn query(&self, stmt: String) -> Result<Vec<RawRow>, StoreError> {
        tracing::debug!(%stmt, "SQL query");
        let rows: Option<Vec<RawRow>> = self.post("/api/query/sql", json!({ "stmt": stmt })).await?;
        Ok(rows.unwrap_or_default())
    }
}

#[async_trait]
impl NoteStore for SiyuanStore {
    async fn fetch_seed_ids(&self, filter: &SeedFilter) -> Result<Vec<NoteId>, StoreError> {
        let stmt = format!(
            "SELECT id FROM blocks WHERE type = 'd' AND id IN \
             (SELECT block_id FROM attributes WHERE name = {} AND value = {}) \
             ORDER BY created, id",
            quote(&filter.attribute),
            quote(&filter.value)
        );

        self.query(stmt)
            .await?
            .iter()
            .map(|row| match row.get("id") {
                Some(Value::String(id)) => Ok(NoteId::new(id.clone())),
                other => Err(StoreError::Decode(format!("seed row without string id: {other:?}"))),
            })
            .collect()
    }

    async fn fetch_document_row(&self, block_id: &str) -> Result<Option<RawRow>, StoreError> {
        let stmt = format!(
            "SELECT * FROM blocks WHERE type = 'd' AND id = \
             (SELECT root_id FROM blocks WHERE id = {})",
            quote(block_id)
        );
        Ok(self.query(stmt).await?.into_iter().next())
    }

    async fn fetch_asset_paths(&self, note: &NoteId) -> Result<Vec<String>, StoreError> {
        let stmt = format!(
            "SELECT DISTINCT path FROM assets WHERE root_id = {} ORDER BY path",
            quote(note.as_str())
        );

        Ok(self
            .query(stmt)
            .await?
            .iter()
            .filter_map(|row| row.get("path").and_then(Value::as_str).map(str::to_string))
            .collect())
    }

    async fn fetch_attribute_rows(&self, note: &NoteId, prefix: &str) -> Result<Vec<RawRow>, StoreError> {
        let stmt = format!(
            "SELECT name, value FROM attributes WHERE root_id = {} AND name LIKE {} ORDER BY name",
            quote(note.as_str()),
            quote(&format!("{prefix}%"))
        );
        self.query(stmt).await
    }

    async fn fetch_raw_content(&self, note: &NoteId) -> Result<String, StoreError> {
        let exported: Option<ExportedMarkdown> = self
            .post("/api/export/exportMdContent", json!({ "id": note.as_str() }))
            .await?;

        exported
            .map(|e| e.content)
            .ok_or_else(|| StoreError::Decode(format!("no exported content for {note}")))
    }
}

/// SQL string literal with embedded quotes doubled
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn normalize_api_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}
