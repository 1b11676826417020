use async_trait::async_trait;

use loopcheck_core::{CheckError, PushChannel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushChannelConfig {
    /// Base URL of the administrative push endpoint.
    pub endpoint: String,
    /// Bearer credential; empty disables the authorization header.
    pub api_key: String,
    pub request_timeout_ms: u64,
}

/// Administrative push client: one POST per probe to
/// `{endpoint}/@connections/{connectionId}`, no response body consumed.
pub struct PushChannelClient {
    client: reqwest::Client,
    config: PushChannelConfig,
}

impl PushChannelClient {
    pub fn new(config: PushChannelConfig) -> Result<Self, CheckError> {
        if config.endpoint.trim().is_empty() {
            return Err(CheckError::delivery("push endpoint is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()
            .map_err(|error| {
                CheckError::delivery(format!("failed to build http client: {error}"))
            })?;
        Ok(Self { client, config })
    }

    fn connection_url(&self, connection_id: &str) -> String {
        format!(
            "{}/@connections/{connection_id}",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PushChannel for PushChannelClient {
    async fn push(&self, connection_id: &str, payload: &[u8]) -> Result<(), CheckError> {
        let mut request = self
            .client
            .post(self.connection_url(connection_id))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec());
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| CheckError::delivery(format!("push request failed: {error}")))?;
        let status = response.status();
        if status.as_u16() == 410 {
            return Err(CheckError::delivery(format!(
                "target connection {connection_id} is stale (410 Gone)"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckError::delivery(format!(
                "push channel returned status {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(())
    }
}
