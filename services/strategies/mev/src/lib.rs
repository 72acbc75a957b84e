//! # Mempool Relay Strategy
//!
//! ## Purpose
//!
//! Watches pending transactions, decides when to act on one, and submits
//! follow-up transactions through a private relay so they land right after
//! the trigger. Receipts and relay responses are correlated back to the
//! requests that caused them.
//!
//! ## Integration Points
//!
//! - **Input**: [`adapter_service::MempoolFeed`] transaction stream
//! - **Decision**: [`DecisionGate`] limits how many triggers fire
//! - **Construction**: [`BundleBuilder`] signs follow-ups via [`SigningService`]
//!   and reads chain state via [`LedgerView`]
//! - **Output**: [`adapter_service::RelayTransport`] carrying
//!   `eth_sendBundle` / `eth_sendPrivateRawTransaction`
//! - **Feedback**: [`ReceiptEvent`]s to an observer and broadcast subscribers
//!
//! ## Architecture Role
//!
//! ```text
//! Mempool feed ──► RelayClient ──► DecisionGate ──► BundleBuilder
//!                      │                                  │
//!                      │                     SubmissionPayload(s)
//!                      ▼                                  │
//!               ReceiptTracker ◄── relay frames ◄── Relay channel
//!                      │
//!                      └──► observer / broadcast listeners
//! ```

pub mod bundle;
pub mod client;
pub mod error;
pub mod gate;
pub mod payload;
pub mod policy;
pub mod receipts;
pub mod signer;

#[cfg(test)]
mod test_support;

pub use bundle::BundleBuilder;
pub use client::{ClientState, ClientStats, RelayClient};
pub use error::{MevError, Result};
pub use gate::{DecisionGate, TriggerPredicate};
pub use payload::{
    BlockBuilder, BundleSubmission, PrivateTransaction, PrivateTransactions, SubmissionPayload,
    SEND_BUNDLE, SEND_PRIVATE_TRANSACTION,
};
pub use policy::{
    BundleRouting, FollowUpIntent, Refund, RoutingOptions, SubmissionPolicy, SubmissionStrategy,
};
pub use receipts::{ReceiptEvent, ReceiptObserver, ReceiptTracker};
pub use signer::{LedgerView, ProviderLedger, SigningService, WalletSigner};
