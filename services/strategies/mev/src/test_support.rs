//! In-process doubles for the signing, ledger, feed and relay seams

use adapter_service::{
    AdapterError, MempoolFeed, MessageHandler, RelayConnector, RelayTransport, Shutdown,
    TransactionStream,
};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use types::{Address, ObservedTransaction, SignedTransactionBytes, SigningRequest, TxHash};

use crate::error::{MevError, Result};
use crate::signer::{LedgerView, SigningService};

pub fn trigger(seed: u8) -> ObservedTransaction {
    ObservedTransaction::new(TxHash::from_bytes([seed; 32]), vec![0xf8, seed, 0x01])
}

pub struct MockSigner {
    address: Address,
    calls: AtomicUsize,
    fail_on: Option<usize>,
    signed: Mutex<Vec<SigningRequest>>,
}

impl MockSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            calls: AtomicUsize::new(0),
            fail_on: None,
            signed: Mutex::new(Vec::new()),
        }
    }

    /// Fail the `call`-th signing request (0-based)
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on = Some(call);
        self
    }

    /// Deterministic stand-in for signed bytes
    pub fn encode(request: &SigningRequest) -> Vec<u8> {
        let mut bytes = vec![0xf8];
        bytes.extend_from_slice(&request.value.to_be_bytes()[12..]);
        bytes.push(request.nonce.unwrap_or(0xff) as u8);
        bytes
    }

    pub fn signed(&self) -> Vec<SigningRequest> {
        self.signed.lock().clone()
    }
}

#[async_trait]
impl SigningService for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign(&self, request: &SigningRequest) -> Result<SignedTransactionBytes> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on == Some(call) {
            return Err(MevError::Signing("hardware wallet unplugged".to_string()));
        }
        self.signed.lock().push(request.clone());
        Ok(SignedTransactionBytes::new(Self::encode(request)))
    }
}

pub struct MockLedger {
    height: u64,
    nonce: u64,
    fail: bool,
    hang: bool,
    height_queries: AtomicUsize,
    nonce_queries: AtomicUsize,
}

impl MockLedger {
    pub fn new(height: u64, nonce: u64) -> Self {
        Self {
            height,
            nonce,
            fail: false,
            hang: false,
            height_queries: AtomicUsize::new(0),
            nonce_queries: AtomicUsize::new(0),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Height queries never complete
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn height_queries(&self) -> usize {
        self.height_queries.load(Ordering::SeqCst)
    }

    pub fn nonce_queries(&self) -> usize {
        self.nonce_queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerView for MockLedger {
    async fn block_number(&self) -> Result<u64> {
        self.height_queries.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail {
            return Err(MevError::Ledger("node unreachable".to_string()));
        }
        Ok(self.height)
    }

    async fn pending_nonce(&self, _account: Address) -> Result<u64> {
        self.nonce_queries.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MevError::Ledger("node unreachable".to_string()));
        }
        Ok(self.nonce)
    }
}

pub type FeedItem = adapter_service::Result<ObservedTransaction>;

/// Feed backed by a channel; one subscription only
pub struct MockFeed {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<FeedItem>>>,
    subscriptions: AtomicUsize,
}

impl MockFeed {
    pub fn new() -> (Self, mpsc::UnboundedSender<FeedItem>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let feed = Self {
            receiver: Mutex::new(Some(rx)),
            subscriptions: AtomicUsize::new(0),
        };
        (feed, tx)
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MempoolFeed for MockFeed {
    async fn subscribe(&self) -> adapter_service::Result<TransactionStream> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or_else(|| AdapterError::Configuration("feed already subscribed".to_string()))?;

        Ok(stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }
}

/// Relay double recording outbound frames; inbound frames are injected
pub struct MockRelay {
    sent: Mutex<Vec<String>>,
    handler: Mutex<Option<MessageHandler>>,
    open: AtomicBool,
    closes: AtomicUsize,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            handler: Mutex::new(None),
            open: AtomicBool::new(true),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    /// Push a frame through the registered handler
    pub fn deliver(&self, text: &str) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(text.to_string());
        }
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn reopen(&self) {
        self.open.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RelayTransport for MockRelay {
    async fn send_text(&self, text: String) -> adapter_service::Result<()> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(AdapterError::Transport("mock relay closed".to_string()));
        }
        self.sent.lock().push(text);
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        *self.handler.lock() = Some(handler);
    }

    async fn close(&self) -> adapter_service::Result<()> {
        self.open.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub struct MockConnector {
    relay: Arc<MockRelay>,
    failure: Mutex<Option<AdapterError>>,
}

impl MockConnector {
    pub fn new(relay: Arc<MockRelay>) -> Self {
        Self {
            relay,
            failure: Mutex::new(None),
        }
    }

    pub fn failing(relay: Arc<MockRelay>, error: AdapterError) -> Self {
        Self {
            relay,
            failure: Mutex::new(Some(error)),
        }
    }
}

#[async_trait]
impl RelayConnector for MockConnector {
    async fn connect(&self, _shutdown: Shutdown) -> adapter_service::Result<Arc<dyn RelayTransport>> {
        if let Some(error) = self.failure.lock().take() {
            return Err(error);
        }
        Ok(self.relay.clone())
    }
}
