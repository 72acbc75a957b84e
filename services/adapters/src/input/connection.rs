//! WebSocket connection setup shared by the mempool feed and the relay channel

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::{AdapterError, Result};

/// Client websocket stream type used by every adapter
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Header carrying the API key when none is configured explicitly
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// Configuration for a single websocket endpoint
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// WebSocket URL (`ws://` or `wss://`)
    pub url: String,
    /// API key sent on the handshake
    pub api_key: Option<String>,
    /// Header name for the API key
    pub api_key_header: String,
    /// Handshake must complete within this window
    pub connect_timeout: Duration,
}

impl ConnectionConfig {
    /// Endpoint with no credentials and a 10s readiness window
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Attach an API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API key header name
    pub fn with_api_key_header(mut self, header: impl Into<String>) -> Self {
        self.api_key_header = header.into();
        self
    }

    /// Override the readiness window
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Reject URLs that are not websocket endpoints
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url).map_err(|e| {
            AdapterError::Configuration(format!("Invalid endpoint URL '{}': {}", self.url, e))
        })?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(AdapterError::Configuration(format!(
                "Endpoint must use ws:// or wss://, got '{}'",
                self.url
            )));
        }

        if self.connect_timeout.is_zero() {
            return Err(AdapterError::Configuration(
                "Connect timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the handshake request including the API key header
    pub fn handshake_request(&self) -> Result<Request> {
        let mut request = self.url.as_str().into_client_request().map_err(|e| {
            AdapterError::Configuration(format!("Invalid endpoint URL '{}': {}", self.url, e))
        })?;

        if let Some(api_key) = &self.api_key {
            let name = HeaderName::from_bytes(self.api_key_header.as_bytes()).map_err(|e| {
                AdapterError::Configuration(format!(
                    "Invalid header name '{}': {}",
                    self.api_key_header, e
                ))
            })?;
            let value = HeaderValue::from_str(api_key).map_err(|_| {
                AdapterError::Configuration("API key is not a valid header value".to_string())
            })?;
            request.headers_mut().insert(name, value);
        }

        Ok(request)
    }
}

/// Open a websocket, bounded by the configured readiness window.
///
/// 401/403 handshake rejections map to `AuthenticationFailed`, an expired
/// window to `ReadyTimeout`, anything else to `ConnectionFailed`.
pub async fn connect(config: &ConnectionConfig) -> Result<WsStream> {
    config.validate()?;
    let request = config.handshake_request()?;

    info!("🔌 Connecting to {}", config.url);

    match timeout(config.connect_timeout, connect_async(request)).await {
        Ok(Ok((stream, response))) => {
            debug!("Handshake with {} returned {}", config.url, response.status());
            info!("✅ Connected to {}", config.url);
            Ok(stream)
        }
        Ok(Err(WsError::Http(response)))
            if matches!(
                response.status(),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ) =>
        {
            warn!(
                "🔒 {} rejected credentials with HTTP {}",
                config.url,
                response.status()
            );
            Err(AdapterError::AuthenticationFailed {
                endpoint: config.url.clone(),
                status: response.status().as_u16(),
            })
        }
        Ok(Err(e)) => Err(AdapterError::ConnectionFailed {
            endpoint: config.url.clone(),
            reason: e.to_string(),
        }),
        Err(_) => {
            warn!(
                "⏱️ {} not ready within {}ms",
                config.url,
                config.connect_timeout.as_millis()
            );
            Err(AdapterError::ReadyTimeout {
                endpoint: config.url.clone(),
                timeout_ms: config.connect_timeout.as_millis() as u64,
            })
        }
    }
}
