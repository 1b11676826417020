use async_trait::async_trait;
use serde_json::{json, Value};

use loopcheck_core::{CheckError, ConnectionRecord, ConnectionRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryScanConfig {
    /// Administrative scan endpoint of the connection registry.
    pub endpoint: String,
    /// Registry table holding the active connection records.
    pub table: String,
    /// Bearer credential; empty disables the authorization header.
    pub api_key: String,
    pub request_timeout_ms: u64,
}

/// Full-scan client for the connection registry. The underlying store types
/// every field as a string attribute (`{"S": ...}`), with `sourceIp` nested
/// under a `metadata` map.
pub struct RegistryScanClient {
    client: reqwest::Client,
    config: RegistryScanConfig,
}

impl RegistryScanClient {
    pub fn new(config: RegistryScanConfig) -> Result<Self, CheckError> {
        if config.endpoint.trim().is_empty() {
            return Err(CheckError::registry("registry endpoint is empty"));
        }
        if config.table.trim().is_empty() {
            return Err(CheckError::registry("registry table name is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()
            .map_err(|error| {
                CheckError::registry(format!("failed to build http client: {error}"))
            })?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ConnectionRegistry for RegistryScanClient {
    async fn scan_connections(&self) -> Result<Vec<ConnectionRecord>, CheckError> {
        let mut request = self
            .client
            .post(self.config.endpoint.trim_end_matches('/'))
            .json(&json!({ "TableName": self.config.table }));
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| CheckError::registry(format!("scan request failed: {error}")))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| CheckError::registry(format!("scan response unreadable: {error}")))?;
        if !status.is_success() {
            return Err(CheckError::registry(format!(
                "scan returned status {}: {}",
                status.as_u16(),
                truncate_body(&body)
            )));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|error| CheckError::registry(format!("scan response not JSON: {error}")))?;
        Ok(parse_scan_items(&value))
    }
}

/// Extracts connection records from a scan response, dropping items without
/// a `connectionId`.
pub fn parse_scan_items(response: &Value) -> Vec<ConnectionRecord> {
    let Some(items) = response.get("Items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let connection_id = string_attr(item, "connectionId")?;
            let user_id = string_attr(item, "userId").filter(|value| !value.is_empty());
            Some(ConnectionRecord {
                connection_id,
                device_id: string_attr(item, "deviceId").unwrap_or_default(),
                user_id,
                source_ip: nested_metadata_attr(item, "sourceIp").unwrap_or_default(),
                connected_at: string_attr(item, "connectedAt").unwrap_or_default(),
            })
        })
        .collect()
}

fn string_attr(item: &Value, name: &str) -> Option<String> {
    item.get(name)?
        .get("S")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn nested_metadata_attr(item: &Value, name: &str) -> Option<String> {
    item.get("metadata")?
        .get("M")?
        .get(name)?
        .get("S")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn truncate_body(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map(|(index, _)| index)
        .unwrap_or(body.len());
    &body[..end]
}
