//! Websocket mempool feed over `eth_subscribe("newPendingTransactions", true)`

use async_trait::async_trait;
use ethers_core::types::Transaction;
use futures_util::{stream, SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use types::{ObservedTransaction, TxHash};

use super::connection::{connect, ConnectionConfig, WsStream};
use super::{MempoolFeed, TransactionStream};
use crate::shutdown::Shutdown;
use crate::{AdapterError, Result};

const SUBSCRIBE_REQUEST_ID: u64 = 1;

/// Full-body pending transaction feed
pub struct WsMempoolFeed {
    config: ConnectionConfig,
    shutdown: Shutdown,
}

impl WsMempoolFeed {
    /// Create a feed for the given endpoint
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            shutdown: Shutdown::never(),
        }
    }

    /// Stop streams produced by this feed when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Endpoint this feed connects to
    pub fn endpoint(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl MempoolFeed for WsMempoolFeed {
    async fn subscribe(&self) -> Result<TransactionStream> {
        let mut ws = connect(&self.config).await?;

        let request = json!({
            "id": SUBSCRIBE_REQUEST_ID,
            "jsonrpc": "2.0",
            "method": "eth_subscribe",
            "params": ["newPendingTransactions", true],
        });
        ws.send(Message::Text(request.to_string())).await?;

        let ack = timeout(
            self.config.connect_timeout,
            await_ack(&mut ws, &self.config.url),
        )
        .await;
        let subscription = match ack {
            Ok(result) => result?,
            Err(_) => {
                return Err(AdapterError::ReadyTimeout {
                    endpoint: self.config.url.clone(),
                    timeout_ms: self.config.connect_timeout.as_millis() as u64,
                })
            }
        };
        info!(
            "📡 Subscribed to pending transactions on {} ({})",
            self.config.url, subscription
        );

        let state = FeedState {
            ws,
            shutdown: self.shutdown.clone(),
            endpoint: self.config.url.clone(),
            finished: false,
        };

        Ok(stream::unfold(state, next_transaction).boxed())
    }
}

struct FeedState {
    ws: WsStream,
    shutdown: Shutdown,
    endpoint: String,
    finished: bool,
}

impl FeedState {
    fn lost(mut self, reason: Option<String>) -> Option<(Result<ObservedTransaction>, Self)> {
        warn!("🔌 Mempool feed {} lost: {:?}", self.endpoint, reason);
        self.finished = true;
        let err = AdapterError::ConnectionLost {
            endpoint: self.endpoint.clone(),
            reason,
        };
        Some((Err(err), self))
    }
}

async fn next_transaction(
    mut state: FeedState,
) -> Option<(Result<ObservedTransaction>, FeedState)> {
    if state.finished {
        return None;
    }

    loop {
        tokio::select! {
            _ = state.shutdown.triggered() => {
                debug!("Mempool feed {} stopping on shutdown", state.endpoint);
                if let Err(e) = state.ws.close(None).await {
                    debug!("Mempool feed {} did not close cleanly: {}", state.endpoint, e);
                }
                return None;
            }
            frame = state.ws.next() => match frame {
                Some(Ok(Message::Text(text))) => match parse_notification(&text) {
                    Ok(Some(tx)) => return Some((Ok(tx), state)),
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Skipping malformed mempool notification: {}", e);
                        continue;
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = state.ws.send(Message::Pong(payload)).await {
                        return state.lost(Some(e.to_string()));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string());
                    return state.lost(reason);
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return state.lost(Some(e.to_string())),
                None => return state.lost(None),
            }
        }
    }
}

async fn await_ack(ws: &mut WsStream, endpoint: &str) -> Result<String> {
    while let Some(frame) = ws.next().await {
        match frame? {
            Message::Text(text) => {
                let value: Value = serde_json::from_str(&text)?;
                if value.get("id").and_then(Value::as_u64) != Some(SUBSCRIBE_REQUEST_ID) {
                    continue;
                }
                if let Some(error) = value.get("error") {
                    return Err(AdapterError::InvalidMessage(format!(
                        "Subscription rejected: {}",
                        error
                    )));
                }
                return value
                    .get("result")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AdapterError::InvalidMessage("Subscription ack without id".to_string())
                    });
            }
            Message::Ping(payload) => ws.send(Message::Pong(payload)).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }

    Err(AdapterError::ConnectionLost {
        endpoint: endpoint.to_string(),
        reason: Some("closed before subscription ack".to_string()),
    })
}

/// Decode one inbound frame.
///
/// `Ok(None)` for frames that are not subscription notifications.
pub fn parse_notification(text: &str) -> Result<Option<ObservedTransaction>> {
    let value: Value = serde_json::from_str(text)?;

    if value.get("method").and_then(Value::as_str) != Some("eth_subscription") {
        return Ok(None);
    }

    let result = value
        .get("params")
        .and_then(|params| params.get("result"))
        .ok_or_else(|| {
            AdapterError::InvalidMessage("Notification without params.result".to_string())
        })?;

    if result.is_string() {
        return Err(AdapterError::InvalidMessage(
            "Feed delivered a bare hash, full transaction bodies required".to_string(),
        ));
    }

    let tx: Transaction = serde_json::from_value(result.clone())?;
    Ok(Some(ObservedTransaction::new(
        TxHash::from_bytes(tx.hash.0),
        tx.rlp().to_vec(),
    )))
}
