use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use loopcheck_core::{CheckError, FrameEvent, FrameTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsConnectConfig {
    /// Duplex socket endpoint, e.g. `wss://channel.example.com`.
    pub endpoint: String,
    /// Identity of the connecting test user; must be a distinct
    /// identity/device pair from the target bot.
    pub user_id: String,
    pub device_id: String,
    /// Bearer credential; empty disables the authorization header.
    pub api_key: String,
}

/// Builds the authenticated upgrade request: test identity in the query
/// string, credential in the authorization header.
pub fn build_connect_request(config: &WsConnectConfig) -> Result<Request, CheckError> {
    let url = format!(
        "{}?userId={}&deviceId={}",
        config.endpoint.trim_end_matches('/'),
        config.user_id,
        config.device_id
    );
    let mut request = url.into_client_request().map_err(|error| {
        CheckError::transport(format!("invalid socket endpoint '{}': {error}", config.endpoint))
    })?;
    if !config.api_key.is_empty() {
        let value = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|error| CheckError::transport(format!("invalid api key header: {error}")))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    Ok(request)
}

/// Live duplex socket reduced to text frames for the stream observer.
pub struct WsFrameTransport {
    config: WsConnectConfig,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WsFrameTransport {
    pub fn new(config: WsConnectConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }
}

#[async_trait]
impl FrameTransport for WsFrameTransport {
    async fn connect(&mut self) -> Result<(), CheckError> {
        let request = build_connect_request(&self.config)?;
        let (stream, _response) = connect_async(request).await.map_err(|error| {
            CheckError::transport(format!("failed to open duplex socket: {error}"))
        })?;
        println!(
            "  Connected (userId={}, deviceId={})",
            self.config.user_id, self.config.device_id
        );
        self.stream = Some(stream);
        Ok(())
    }

    async fn next_text(&mut self) -> Result<FrameEvent, CheckError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(CheckError::transport("socket is not connected"));
        };
        loop {
            match stream.next().await {
                None => return Ok(FrameEvent::Closed),
                Some(Err(error)) => {
                    return Err(CheckError::transport(format!("socket read failed: {error}")));
                }
                Some(Ok(WsMessage::Text(text))) => {
                    return Ok(FrameEvent::Text(text.to_string()));
                }
                Some(Ok(WsMessage::Close(_))) => return Ok(FrameEvent::Closed),
                // Transport-level traffic; not observer business.
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(error) = stream.close(None).await {
                tracing::debug!("socket close failed: {error}");
            }
        }
    }
}
