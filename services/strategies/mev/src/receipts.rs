//! Receipt correlation and fan-out
//!
//! Every submission sent with `awaitReceipt` gets a timer task. A receipt
//! notification or an error response resolves the timer for its request id; a
//! plain result only acknowledges. Frames without a known id are still
//! delivered, just uncorrelated. Events go to the optional observer callback
//! and to a broadcast channel any number of listeners can subscribe to.

use adapter_service::{InboundFrame, Shutdown};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};
use types::TxHash;

use crate::error::MevError;

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ReceiptEvent {
    /// JSON-RPC `result` for a request
    Acknowledged { id: u64, result: Value },
    /// JSON-RPC `error` for a request
    Rejected { id: u64, code: i64, message: String },
    /// `receiptNotification`, correlated when it carries an id
    Receipt { id: Option<u64>, receipt: Value },
    /// Nothing arrived for `id` within its window
    TimedOut { id: u64, after: Duration },
    /// Shutdown while `id` was still waiting
    Cancelled { id: u64 },
    /// Build or send failed for a triggered transaction
    SubmissionFailed { trigger: TxHash, reason: String },
    /// Valid JSON with no recognised shape
    Unrecognized { frame: Value },
}

pub type ReceiptObserver = Arc<dyn Fn(&ReceiptEvent) + Send + Sync>;

struct Inner {
    pending: Mutex<HashMap<u64, oneshot::Sender<()>>>,
    events: broadcast::Sender<ReceiptEvent>,
    observer: RwLock<Option<ReceiptObserver>>,
    shutdown: RwLock<Shutdown>,
}

impl Inner {
    fn emit(&self, event: ReceiptEvent) {
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer(&event);
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn resolve(&self, id: u64) -> bool {
        match self.pending.lock().remove(&id) {
            Some(waiter) => {
                let _ = waiter.send(());
                true
            }
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct ReceiptTracker {
    inner: Arc<Inner>,
}

impl ReceiptTracker {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(HashMap::new()),
                events,
                observer: RwLock::new(None),
                shutdown: RwLock::new(Shutdown::never()),
            }),
        }
    }

    /// Waits started after this call resolve as `Cancelled` when `shutdown` fires
    pub fn attach_shutdown(&self, shutdown: Shutdown) {
        *self.inner.shutdown.write() = shutdown;
    }

    /// Replace the observer callback
    pub fn set_observer(&self, observer: ReceiptObserver) {
        *self.inner.observer.write() = Some(observer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReceiptEvent> {
        self.inner.events.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Start the receipt window for request `id`
    pub fn track(&self, id: u64, timeout: Duration) {
        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(id, tx);

        let inner = self.inner.clone();
        let mut shutdown = self.inner.shutdown.read().clone();
        tokio::spawn(async move {
            tokio::select! {
                outcome = tokio::time::timeout(timeout, rx) => {
                    if outcome.is_err() && inner.pending.lock().remove(&id).is_some() {
                        warn!("⏱️ No receipt for request {} within {}ms", id, timeout.as_millis());
                        inner.emit(ReceiptEvent::TimedOut { id, after: timeout });
                    }
                }
                _ = shutdown.triggered() => {
                    if inner.pending.lock().remove(&id).is_some() {
                        debug!("Receipt wait for request {} cancelled", id);
                        inner.emit(ReceiptEvent::Cancelled { id });
                    }
                }
            }
        });
    }

    /// Drop the window for a request that never went out
    pub fn forget(&self, id: u64) {
        self.inner.pending.lock().remove(&id);
    }

    /// Classify one inbound relay frame and emit the matching event
    pub fn handle_frame(&self, text: &str) {
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                error!("❌ Unparsable relay frame ({}): {}", e, text);
                return;
            }
        };

        let event = match frame {
            InboundFrame::Receipt { id, receipt } => {
                if let Some(id) = id {
                    self.inner.resolve(id);
                }
                info!("🧾 Receipt notification (request {:?}): {}", id, receipt);
                ReceiptEvent::Receipt { id, receipt }
            }
            // An ack leaves the receipt window open
            InboundFrame::Response { id, result } => {
                info!("✅ Relay accepted request {}: {}", id, result);
                ReceiptEvent::Acknowledged { id, result }
            }
            InboundFrame::ErrorResponse { id, code, message } => {
                self.inner.resolve(id);
                warn!("🚫 Relay rejected request {} ({}): {}", id, code, message);
                ReceiptEvent::Rejected { id, code, message }
            }
            InboundFrame::Other(frame) => {
                debug!("Unrecognized relay frame: {}", frame);
                ReceiptEvent::Unrecognized { frame }
            }
        };

        self.inner.emit(event);
    }

    pub fn report_failure(&self, trigger: TxHash, error: &MevError) {
        error!("❌ Submission for {} failed: {}", trigger, error);
        self.inner.emit(ReceiptEvent::SubmissionFailed {
            trigger,
            reason: error.to_string(),
        });
    }
}

impl Default for ReceiptTracker {
    fn default() -> Self {
        Self::new()
    }
}
