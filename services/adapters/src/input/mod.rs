//! Input adapters: streaming sources of observed mempool transactions

pub mod connection;
pub mod mempool;

use crate::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use types::ObservedTransaction;

pub use connection::{connect, ConnectionConfig, WsStream};
pub use mempool::WsMempoolFeed;

/// Stream of observed transactions.
///
/// Ends after yielding a final `ConnectionLost` error, or silently on shutdown.
pub type TransactionStream = BoxStream<'static, Result<ObservedTransaction>>;

/// Source of pending mempool transactions
#[async_trait]
pub trait MempoolFeed: Send + Sync {
    /// Open one persistent streaming session.
    ///
    /// Every call opens a new session; sessions are not shared or restarted.
    async fn subscribe(&self) -> Result<TransactionStream>;
}
