//! Relay Channel - JSON-RPC submission socket with an asynchronous receipt stream
//!
//! Outbound requests are written straight to the websocket sink. Inbound text
//! frames are read by a dedicated task and handed, in arrival order, to the
//! single registered [`MessageHandler`].

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::jsonrpc::RelayRequest;
use crate::input::connection::{connect, ConnectionConfig, WsStream};
use crate::shutdown::Shutdown;
use crate::{AdapterError, Result};

/// Callback invoked with the raw text of every inbound frame
pub type MessageHandler = Arc<dyn Fn(String) + Send + Sync>;

type WsSink = SplitSink<WsStream, Message>;

/// Bidirectional relay connection
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Write one text frame. Fails with `Transport` once the channel is closed.
    async fn send_text(&self, text: String) -> Result<()>;

    /// Register the inbound handler, replacing any previous one
    fn on_message(&self, handler: MessageHandler);

    /// Send a close frame and stop reading
    async fn close(&self) -> Result<()>;

    /// Whether the channel still accepts sends
    fn is_open(&self) -> bool;
}

impl dyn RelayTransport {
    /// Serialize a JSON-RPC request and send it. Does not wait for a receipt.
    pub async fn send<P: Serialize + Sync>(&self, request: &RelayRequest<P>) -> Result<()> {
        let text = serde_json::to_string(request)?;
        self.send_text(text).await
    }
}

/// Opens relay transports
#[async_trait]
pub trait RelayConnector: Send + Sync {
    /// Connect and wait for readiness. The reader stops when `shutdown` fires.
    async fn connect(&self, shutdown: Shutdown) -> Result<Arc<dyn RelayTransport>>;
}

/// Websocket-backed relay channel
pub struct WsRelayChannel {
    endpoint: String,
    sink: Arc<Mutex<WsSink>>,
    handler: Arc<RwLock<Option<MessageHandler>>>,
    open: Arc<AtomicBool>,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
    messages_sent: AtomicU64,
}

impl WsRelayChannel {
    /// Connect to the relay and start the reader task.
    ///
    /// Fails with `Cancelled` if `shutdown` fires before the handshake ends.
    pub async fn connect(config: &ConnectionConfig, shutdown: Shutdown) -> Result<Self> {
        let mut cancel = shutdown.clone();
        let ws = tokio::select! {
            biased;
            _ = cancel.triggered() => {
                debug!("Relay connect to {} cancelled", config.url);
                return Err(AdapterError::Cancelled);
            }
            ws = connect(config) => ws?,
        };
        let (sink, stream) = ws.split();

        let sink = Arc::new(Mutex::new(sink));
        let handler: Arc<RwLock<Option<MessageHandler>>> = Arc::new(RwLock::new(None));
        let open = Arc::new(AtomicBool::new(true));

        let reader = tokio::spawn(read_frames(
            config.url.clone(),
            stream,
            sink.clone(),
            handler.clone(),
            open.clone(),
            shutdown,
        ));

        info!("✅ Relay channel ready: {}", config.url);

        Ok(Self {
            endpoint: config.url.clone(),
            sink,
            handler,
            open,
            reader: parking_lot::Mutex::new(Some(reader)),
            messages_sent: AtomicU64::new(0),
        })
    }

    /// Endpoint this channel is connected to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of frames written so far
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RelayTransport for WsRelayChannel {
    async fn send_text(&self, text: String) -> Result<()> {
        if !self.open.load(Ordering::Acquire) {
            return Err(AdapterError::Transport(format!(
                "Relay channel to {} is closed",
                self.endpoint
            )));
        }

        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Text(text)).await {
            self.open.store(false, Ordering::Release);
            return Err(AdapterError::Transport(format!(
                "Send to {} failed: {}",
                self.endpoint, e
            )));
        }

        let sent = self.messages_sent.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("📤 Relay frame #{} sent to {}", sent, self.endpoint);
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.write() = Some(handler);
    }

    async fn close(&self) -> Result<()> {
        let was_open = self.open.swap(false, Ordering::AcqRel);

        if was_open {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Close(None)).await {
                debug!("Close frame to {} not delivered: {}", self.endpoint, e);
            }
            if let Err(e) = sink.close().await {
                debug!("Relay sink for {} did not close cleanly: {}", self.endpoint, e);
            }
        }

        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }

        info!("🛑 Relay channel closed: {}", self.endpoint);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl Drop for WsRelayChannel {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.get_mut().take() {
            reader.abort();
        }
    }
}

async fn read_frames(
    endpoint: String,
    mut stream: SplitStream<WsStream>,
    sink: Arc<Mutex<WsSink>>,
    handler: Arc<RwLock<Option<MessageHandler>>>,
    open: Arc<AtomicBool>,
    mut shutdown: Shutdown,
) {
    loop {
        tokio::select! {
            _ = shutdown.triggered() => {
                debug!("Relay reader for {} stopping on shutdown", endpoint);
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => dispatch(&handler, text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => dispatch(&handler, text),
                    Err(_) => warn!("Dropping non-UTF-8 binary frame from {}", endpoint),
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(e) = sink.lock().await.send(Message::Pong(payload)).await {
                        warn!("Failed to answer ping from {}: {}", endpoint, e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    warn!("🔌 Relay {} closed the connection: {:?}", endpoint, frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("❌ Relay {} read error: {}", endpoint, e);
                    break;
                }
                None => {
                    warn!("🔌 Relay {} stream ended", endpoint);
                    break;
                }
            }
        }
    }

    open.store(false, Ordering::Release);
}

fn dispatch(handler: &RwLock<Option<MessageHandler>>, text: String) {
    let current = handler.read().clone();
    match current {
        Some(handler) => handler(text),
        None => warn!("Dropping relay frame, no handler registered: {}", text),
    }
}

/// [`RelayConnector`] producing [`WsRelayChannel`]s
#[derive(Debug, Clone)]
pub struct WsRelayConnector {
    config: ConnectionConfig,
}

impl WsRelayConnector {
    /// Connector for the given relay endpoint
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RelayConnector for WsRelayConnector {
    async fn connect(&self, shutdown: Shutdown) -> Result<Arc<dyn RelayTransport>> {
        let channel = WsRelayChannel::connect(&self.config, shutdown).await?;
        Ok(Arc::new(channel))
    }
}
