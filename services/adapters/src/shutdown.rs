//! Cooperative shutdown signal
//!
//! A [`ShutdownHandle`] flips a `watch` channel once; every cloned [`Shutdown`]
//! observes it. Long-running loops select on [`Shutdown::triggered`] next to
//! their I/O futures.

use tokio::sync::watch;

/// Sending half, owned by whoever decides the process should stop
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

/// Receiving half, cloned into every task that must stop on request
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle/signal pair
pub fn shutdown_channel() -> (ShutdownHandle, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, Shutdown { rx })
}

impl ShutdownHandle {
    /// Signal every subscriber. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Hand out another receiver
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Shutdown {
    /// A signal that never fires
    pub fn never() -> Self {
        shutdown_channel().1
    }

    /// Whether shutdown has already been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    ///
    /// If the handle is dropped without triggering, this never resolves.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
