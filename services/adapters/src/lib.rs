//! # Adapter Service - Mempool and Relay Connectivity
//!
//! ## Purpose
//!
//! Network edge of the mempool relay client. Input adapters stream pending
//! transactions from a mempool feed; output adapters carry signed submissions
//! to a private relay and surface its asynchronous responses.
//!
//! ## Integration Points
//!
//! - **Input**: [`MempoolFeed`] yields [`types::ObservedTransaction`]s decoded
//!   from `eth_subscription` notifications
//! - **Output**: [`RelayTransport`] sends [`RelayRequest`]s and delivers every
//!   inbound frame to one registered [`MessageHandler`]
//! - **Lifecycle**: [`Shutdown`] stops feed streams and relay readers
//!
//! ## Architecture Role
//!
//! ```text
//! Mempool WS ──► WsMempoolFeed ──► TransactionStream ──► strategy
//!                                                          │
//! Relay WS   ◄── WsRelayChannel ◄── RelayRequest ◄─────────┘
//!     │
//!     └──► reader task ──► MessageHandler (receipts, responses)
//! ```
//!
//! ## Failure Semantics
//!
//! Connections are established once. A dropped feed ends its stream with
//! [`AdapterError::ConnectionLost`]; a dropped relay flips the channel closed
//! and later sends fail with [`AdapterError::Transport`]. Reconnection is the
//! caller's decision.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod input;
pub mod output;
pub mod shutdown;

pub use error::{AdapterError, Result};
pub use input::{connect, ConnectionConfig, MempoolFeed, TransactionStream, WsMempoolFeed};
pub use output::{
    InboundFrame, MessageHandler, RelayConnector, RelayRequest, RelayTransport,
    RequestIdGenerator, WsRelayChannel, WsRelayConnector,
};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownHandle};
