//! Bulk Sync Fallback — stateless point-in-time catalog pulls over HTTP.
//!
//! This path shares nothing with the persistent connection: it is a plain
//! request/reply call used to seed or refresh a local read-through cache,
//! usable whatever the WebSocket state. The upstream service has shipped
//! several response envelopes over time; `unwrap_envelope` normalizes them
//! into one canonical list before anything else looks at the data.

use serde_json::Value;
use shared::CatalogItem;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};

/// HTTP client for the IMS catalog endpoints.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(config: &BridgeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.bulk_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.http_base_url(),
        }
    }

    /// Fetch the full catalog.
    pub async fn fetch_all(&self) -> BridgeResult<Vec<CatalogItem>> {
        let url = format!(
            "{}/api/Shoes?pageNumber=1&pageSize=1000",
            self.base_url.trim_end_matches('/')
        );
        let body = self.get_json(&url).await?;
        let entries = unwrap_envelope(body)?;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let item: CatalogItem = serde_json::from_value(entry)
                .map_err(|e| BridgeError::FetchFailed(format!("malformed catalog entry: {e}")))?;
            items.push(item);
        }
        Ok(items)
    }

    /// Fetch a single item by id.
    pub async fn fetch_item(&self, item_id: i64) -> BridgeResult<CatalogItem> {
        let url = format!("{}/api/Shoes/{item_id}", self.base_url.trim_end_matches('/'));
        let body = self.get_json(&url).await?;
        let entry = unwrap_single(body);
        serde_json::from_value(entry)
            .map_err(|e| BridgeError::FetchFailed(format!("malformed catalog entry: {e}")))
    }

    async fn get_json(&self, url: &str) -> BridgeResult<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::FetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::FetchFailed(format!(
                "IMS returned HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BridgeError::FetchFailed(format!("invalid JSON body: {e}")))
    }
}

/// Normalize a list response. Accepts a bare array or an object wrapping
/// the array under a `data` field of any capitalization.
fn unwrap_envelope(body: Value) -> BridgeResult<Vec<Value>> {
    match body {
        Value::Array(entries) => Ok(entries),
        Value::Object(map) => {
            for (key, value) in map {
                if key.eq_ignore_ascii_case("data") {
                    if let Value::Array(entries) = value {
                        return Ok(entries);
                    }
                }
            }
            Err(BridgeError::FetchFailed(
                "response envelope has no data array".into(),
            ))
        }
        other => Err(BridgeError::FetchFailed(format!(
            "unexpected response shape: {other}"
        ))),
    }
}

/// Normalize a single-item response: either the bare object or the same
/// wrapped envelope.
fn unwrap_single(body: Value) -> Value {
    if let Value::Object(map) = &body {
        for (key, value) in map {
            if key.eq_ignore_ascii_case("data") && value.is_object() {
                return value.clone();
            }
        }
    }
    body
}
