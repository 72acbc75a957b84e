//! Relay client: mempool feed in, submissions out, receipts fanned out
//!
//! ```text
//! Disconnected → Connecting → Ready → Streaming → Closing → Closed
//!                     │                                        ▲
//!                     └──────── feed or relay not ready ───────┘
//! ```
//!
//! Feed items reach the [`DecisionGate`] only while `Streaming`. Each
//! triggered transaction is built, sent and registered for receipts before the
//! next feed item is read. Failures past startup are reported to observers and
//! never end the stream; startup failures and a lost feed end `run`.

use adapter_service::{
    AdapterError, MempoolFeed, RelayConnector, RelayTransport, RequestIdGenerator, Shutdown,
};
use futures_util::StreamExt;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use types::ObservedTransaction;

use crate::bundle::BundleBuilder;
use crate::error::{MevError, Result};
use crate::gate::DecisionGate;
use crate::policy::SubmissionPolicy;
use crate::receipts::{ReceiptEvent, ReceiptObserver, ReceiptTracker};
use crate::signer::{LedgerView, SigningService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Ready,
    Streaming,
    Closing,
    Closed,
}

#[derive(Debug, Default)]
pub struct ClientStats {
    observed: AtomicU64,
    triggered: AtomicU64,
    submitted: AtomicU64,
    failed: AtomicU64,
}

impl ClientStats {
    /// Feed items seen while streaming
    pub fn observed(&self) -> u64 {
        self.observed.load(Ordering::Relaxed)
    }

    /// Items that passed the gate
    pub fn triggered(&self) -> u64 {
        self.triggered.load(Ordering::Relaxed)
    }

    /// Requests written to the relay
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Build or send failures
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

pub struct RelayClient {
    feed: Arc<dyn MempoolFeed>,
    connector: Arc<dyn RelayConnector>,
    gate: DecisionGate,
    builder: BundleBuilder,
    policy: SubmissionPolicy,
    ids: RequestIdGenerator,
    tracker: ReceiptTracker,
    state: RwLock<ClientState>,
    stats: ClientStats,
}

impl RelayClient {
    pub fn new(
        feed: Arc<dyn MempoolFeed>,
        connector: Arc<dyn RelayConnector>,
        signer: Arc<dyn SigningService>,
        ledger: Arc<dyn LedgerView>,
        policy: SubmissionPolicy,
        gate: DecisionGate,
    ) -> Result<Self> {
        policy.validate()?;

        Ok(Self {
            feed,
            connector,
            gate,
            builder: BundleBuilder::new(signer, ledger),
            policy,
            ids: RequestIdGenerator::new(),
            tracker: ReceiptTracker::new(),
            state: RwLock::new(ClientState::Disconnected),
            stats: ClientStats::default(),
        })
    }

    pub fn state(&self) -> ClientState {
        *self.state.read()
    }

    pub fn stats(&self) -> &ClientStats {
        &self.stats
    }

    pub fn gate(&self) -> &DecisionGate {
        &self.gate
    }

    /// Callback invoked for every receipt event, replacing any previous one
    pub fn set_observer(&self, observer: ReceiptObserver) {
        self.tracker.set_observer(observer);
    }

    /// Independent listener for receipt events
    pub fn subscribe_receipts(&self) -> broadcast::Receiver<ReceiptEvent> {
        self.tracker.subscribe()
    }

    /// Connect, stream until shutdown or feed loss, then close.
    ///
    /// Returns `Ok(())` after a requested shutdown and the originating error
    /// otherwise. A client runs once.
    pub async fn run(&self, mut shutdown: Shutdown) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state != ClientState::Disconnected {
                return Err(MevError::Configuration(format!(
                    "Relay client cannot start from state {:?}",
                    *state
                )));
            }
            *state = ClientState::Connecting;
        }

        self.tracker.attach_shutdown(shutdown.clone());
        info!("🚀 Relay client connecting");

        let (channel, subscription) = tokio::join!(
            self.connector.connect(shutdown.clone()),
            self.feed.subscribe()
        );

        let channel = match channel {
            Ok(channel) => channel,
            Err(e) => {
                error!("❌ Relay channel not ready: {}", e);
                return self.fail(e.into());
            }
        };

        let mut transactions = match subscription {
            Ok(stream) => stream,
            Err(e) => {
                error!("❌ Mempool subscription failed: {}", e);
                if let Err(close_err) = channel.close().await {
                    warn!("Relay close after failed startup: {}", close_err);
                }
                return self.fail(e.into());
            }
        };

        let tracker = self.tracker.clone();
        channel.on_message(Arc::new(move |text| tracker.handle_frame(&text)));

        self.set_state(ClientState::Ready);
        info!("✅ Mempool feed and relay channel ready");
        self.set_state(ClientState::Streaming);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("🛑 Shutdown requested");
                    break Ok(());
                }
                item = transactions.next() => match item {
                    Some(Ok(tx)) => {
                        let trigger = tx.hash();
                        tokio::select! {
                            biased;
                            _ = shutdown.triggered() => {
                                warn!("🛑 Shutdown while handling {}", trigger);
                                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                                self.tracker.report_failure(trigger, &MevError::Cancelled);
                                break Ok(());
                            }
                            _ = self.handle_transaction(&channel, tx) => {}
                        }
                    }
                    Some(Err(e)) if e.is_connection_loss() => {
                        error!("❌ Mempool feed lost: {}", e);
                        break Err(MevError::from(e));
                    }
                    Some(Err(e)) => warn!("Mempool feed error: {}", e),
                    None if shutdown.is_triggered() => break Ok(()),
                    None => {
                        error!("❌ Mempool feed ended");
                        break Err(MevError::from(AdapterError::ConnectionLost {
                            endpoint: "mempool feed".to_string(),
                            reason: Some("stream ended".to_string()),
                        }));
                    }
                }
            }
        };

        self.set_state(ClientState::Closing);
        drop(transactions);
        if let Err(e) = channel.close().await {
            warn!("Relay close failed: {}", e);
        }
        self.set_state(ClientState::Closed);

        info!(
            "👋 Relay client closed: {} observed, {} triggered, {} submitted, {} failed",
            self.stats.observed(),
            self.stats.triggered(),
            self.stats.submitted(),
            self.stats.failed()
        );

        outcome
    }

    async fn handle_transaction(&self, channel: &Arc<dyn RelayTransport>, tx: ObservedTransaction) {
        self.stats.observed.fetch_add(1, Ordering::Relaxed);

        if !self.gate.should_trigger(&tx) {
            return;
        }
        self.stats.triggered.fetch_add(1, Ordering::Relaxed);
        info!(
            "🎯 Triggered on {} ({} triggers left)",
            tx.hash(),
            self.gate.remaining()
        );

        let payloads = match self.builder.build(&tx, &self.policy).await {
            Ok(payloads) => payloads,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                self.tracker.report_failure(tx.hash(), &e);
                return;
            }
        };

        for payload in payloads {
            let id = self.ids.next_id();
            if let Some(window) = payload.receipt_timeout() {
                self.tracker.track(id, window);
            }

            let request = payload.into_request(id);
            match channel.send(&request).await {
                Ok(()) => {
                    self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                    info!("📤 {} #{} sent for {}", request.method, id, tx.hash());
                }
                Err(e) => {
                    self.tracker.forget(id);
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    self.tracker.report_failure(tx.hash(), &MevError::from(e));
                    // Later legs depend on this one
                    break;
                }
            }
        }
    }

    fn set_state(&self, next: ClientState) {
        let mut state = self.state.write();
        debug!("Relay client {:?} → {:?}", *state, next);
        *state = next;
    }

    fn fail(&self, error: MevError) -> Result<()> {
        self.set_state(ClientState::Closed);
        Err(error)
    }
}
