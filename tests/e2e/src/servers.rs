//! Loopback WebSocket servers standing in for the feed and the relay

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, accept_hdr_async};
use tracing::debug;

const API_KEY_HEADER: &str = "x-api-key";

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let url = format!("ws://{}", listener.local_addr().expect("local addr"));
    (listener, url)
}

/// Pending-transaction feed serving one subscriber
pub struct MockMempoolServer {
    pub url: String,
    notifications: Mutex<Option<mpsc::UnboundedSender<String>>>,
    subscriptions: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockMempoolServer {
    pub async fn start() -> Self {
        let (listener, url) = bind().await;
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let subscriptions = Arc::new(AtomicUsize::new(0));
        let counter = subscriptions.clone();

        let task = tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = accept_async(stream).await else {
                return;
            };

            // Wait for eth_subscribe before streaming anything
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let request: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                        if request["method"] == "eth_subscribe" {
                            counter.fetch_add(1, Ordering::SeqCst);
                            let ack = json!({
                                "jsonrpc": "2.0",
                                "id": request["id"],
                                "result": "0xfeedsubscription"
                            });
                            if ws.send(Message::Text(ack.to_string())).await.is_err() {
                                return;
                            }
                            break;
                        }
                    }
                    Some(Ok(_)) => continue,
                    _ => return,
                }
            }

            loop {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(frame) => {
                            if ws.send(Message::Text(frame)).await.is_err() {
                                return;
                            }
                        }
                        None => {
                            debug!("Mock mempool closing feed");
                            let _ = ws.close(None).await;
                            return;
                        }
                    },
                    inbound = ws.next() => match inbound {
                        Some(Ok(_)) => continue,
                        _ => return,
                    }
                }
            }
        });

        Self {
            url,
            notifications: Mutex::new(Some(tx)),
            subscriptions,
            task,
        }
    }

    /// Queue a pending transaction body as an `eth_subscription` notification
    pub fn push(&self, transaction: Value) {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "eth_subscription",
            "params": { "subscription": "0xfeedsubscription", "result": transaction }
        });
        if let Some(tx) = self.notifications.lock().as_ref() {
            let _ = tx.send(frame.to_string());
        }
    }

    /// Close the subscriber's socket after queued notifications drain
    pub fn disconnect(&self) {
        self.notifications.lock().take();
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

impl Drop for MockMempoolServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Relay that checks the API key, records requests and answers each with a
/// JSON-RPC result followed by a receipt notification
pub struct MockRelayServer {
    pub url: String,
    received: Arc<Mutex<Vec<Value>>>,
    rejected: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockRelayServer {
    pub async fn start(api_key: &str) -> Self {
        let (listener, url) = bind().await;
        let received = Arc::new(Mutex::new(Vec::new()));
        let rejected = Arc::new(AtomicUsize::new(0));
        let api_key = api_key.to_string();

        let task = {
            let received = received.clone();
            let rejected = rejected.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    let expected = api_key.clone();
                    let rejections = rejected.clone();
                    let check_key = move |request: &Request, response: Response| {
                        let presented = request
                            .headers()
                            .get(API_KEY_HEADER)
                            .and_then(|value| value.to_str().ok());
                        if presented == Some(expected.as_str()) {
                            Ok(response)
                        } else {
                            rejections.fetch_add(1, Ordering::SeqCst);
                            let mut denied = ErrorResponse::new(Some("invalid api key".to_string()));
                            *denied.status_mut() = StatusCode::UNAUTHORIZED;
                            Err(denied)
                        }
                    };

                    let received = received.clone();
                    tokio::spawn(async move {
                        let Ok(mut ws) = accept_hdr_async(stream, check_key).await else {
                            return;
                        };
                        while let Some(Ok(message)) = ws.next().await {
                            let Message::Text(text) = message else {
                                continue;
                            };
                            let request: Value = match serde_json::from_str(&text) {
                                Ok(value) => value,
                                Err(_) => continue,
                            };
                            let id = request["id"].clone();
                            received.lock().push(request);

                            let response = json!({
                                "jsonrpc": "2.0",
                                "id": id,
                                "result": format!("0xaccepted{}", id)
                            });
                            let receipt = json!({
                                "receiptNotification": { "id": id, "status": "included" }
                            });
                            for frame in [response, receipt] {
                                if ws.send(Message::Text(frame.to_string())).await.is_err() {
                                    return;
                                }
                            }
                        }
                    });
                }
            })
        };

        Self {
            url,
            received,
            rejected,
            task,
        }
    }

    /// Requests received so far, in arrival order
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Handshakes refused for a wrong or missing key
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl Drop for MockRelayServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
