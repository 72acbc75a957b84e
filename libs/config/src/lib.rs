//! # Relay Client Configuration
//!
//! Centralized configuration for the mempool relay client: endpoint URLs,
//! credentials, timeouts and submission routing. Defaults live in
//! [`service`], loading and validation in [`relay_config`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use config::RelayClientConfig;
//!
//! let config = RelayClientConfig::load(None)?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod relay_config;
pub mod service;

pub use relay_config::{
    LedgerSettings, LoggingSettings, MempoolSettings, RelayClientConfig, RelaySettings,
    SignerSettings, StrategyKind, SubmissionSettings,
};
