//! Relay client configuration
//!
//! Layering, lowest priority first:
//! 1. Built-in defaults from [`crate::service`]
//! 2. Optional TOML file
//! 3. `MEV_RELAY__SECTION__KEY` environment variables
//! 4. `FIBER_TEST_KEY` / `ETHEREUM_TEST_PK` for credentials left empty

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::service;

/// Complete client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayClientConfig {
    pub relay: RelaySettings,
    pub mempool: MempoolSettings,
    pub ledger: LedgerSettings,
    pub signer: SignerSettings,
    pub submission: SubmissionSettings,
    pub logging: LoggingSettings,
}

/// Submission / receipt channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub url: String,
    pub api_key: String,
    /// Handshake header the key is sent in
    pub api_key_header: String,
    pub ready_timeout_ms: u64,
}

/// Pending transaction feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolSettings {
    pub url: String,
    /// Falls back to the relay key when unset
    pub api_key: Option<String>,
}

/// Chain state reader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub rpc_url: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SignerSettings {
    /// Hex private key, with or without `0x`
    pub private_key: String,
}

/// Which payload shape the client submits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Trigger plus backrun as one ordered `eth_sendBundle`
    Bundle,
    /// Independent `eth_sendPrivateRawTransaction` legs
    PrivateLegs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionSettings {
    pub strategy: StrategyKind,
    pub trigger_budget: u32,
    pub await_receipt: bool,
    pub receipt_timeout_ms: u64,
    pub public_leg_timeout_ms: u64,
    pub mev_builders: Vec<String>,
    pub refund_percent: Option<u8>,
    pub refund_index: Option<u32>,
    pub follow_up_value_wei: u64,
    pub gas_price_wei: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            url: service::relay::URL.to_string(),
            api_key: String::new(),
            api_key_header: service::relay::API_KEY_HEADER.to_string(),
            ready_timeout_ms: service::relay::READY_TIMEOUT_MS,
        }
    }
}

impl Default for MempoolSettings {
    fn default() -> Self {
        Self {
            url: service::mempool::URL.to_string(),
            api_key: None,
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            rpc_url: service::ledger::RPC_URL.to_string(),
            chain_id: service::ledger::CHAIN_ID,
        }
    }
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Bundle,
            trigger_budget: service::submission::TRIGGER_BUDGET,
            await_receipt: true,
            receipt_timeout_ms: service::submission::RECEIPT_TIMEOUT_MS,
            public_leg_timeout_ms: service::submission::PUBLIC_LEG_TIMEOUT_MS,
            mev_builders: service::submission::MEV_BUILDERS
                .iter()
                .map(|b| b.to_string())
                .collect(),
            refund_percent: None,
            refund_index: None,
            follow_up_value_wei: service::submission::FOLLOW_UP_VALUE_WEI,
            gas_price_wei: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl RelayClientConfig {
    /// Load configuration with the standard `MEV_RELAY` environment prefix
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_with_prefix(path, service::env::PREFIX)?;
        config.apply_credential_env();
        Ok(config)
    }

    /// Load configuration, reading overrides from `{prefix}__SECTION__KEY`
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        let defaults =
            Config::try_from(&Self::default()).context("Failed to seed configuration defaults")?;

        let mut builder = Config::builder().add_source(defaults);

        if let Some(path) = path {
            info!("Loading relay client config from {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("submission.mev_builders"),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Fill empty credentials from the legacy environment variables
    pub fn apply_credential_env(&mut self) {
        if self.relay.api_key.is_empty() {
            if let Ok(key) = std::env::var(service::env::API_KEY) {
                debug!("Using relay API key from {}", service::env::API_KEY);
                self.relay.api_key = key;
            }
        }
        if self.relay.api_key_header.trim().is_empty() {
            bail!("relay.api_key_header must not be empty");
        }

        if self.signer.private_key.is_empty() {
            if let Ok(key) = std::env::var(service::env::PRIVATE_KEY) {
                debug!("Using signing key from {}", service::env::PRIVATE_KEY);
                self.signer.private_key = key;
            }
        }
    }

    /// API key for the mempool feed
    pub fn mempool_api_key(&self) -> &str {
        self.mempool
            .api_key
            .as_deref()
            .unwrap_or(&self.relay.api_key)
    }

    /// Reject configurations the client cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.relay.api_key.is_empty() {
            bail!(
                "Missing relay API key (set relay.api_key or {})",
                service::env::API_KEY
            );
        }

        if self.signer.private_key.is_empty() {
            bail!(
                "Missing signing key (set signer.private_key or {})",
                service::env::PRIVATE_KEY
            );
        }

        for (name, url) in [
            ("relay.url", &self.relay.url),
            ("mempool.url", &self.mempool.url),
            ("ledger.rpc_url", &self.ledger.rpc_url),
        ] {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                bail!("{} must start with ws:// or wss://, got {}", name, url);
            }
        }

        if self.relay.ready_timeout_ms == 0 {
            bail!("relay.ready_timeout_ms must be greater than 0");
        }

        if self.submission.trigger_budget == 0 {
            bail!("submission.trigger_budget must be greater than 0");
        }

        if self.submission.await_receipt
            && (self.submission.receipt_timeout_ms == 0
                || self.submission.public_leg_timeout_ms == 0)
        {
            bail!("Receipt timeouts must be greater than 0 when awaiting receipts");
        }

        if let Some(percent) = self.submission.refund_percent {
            if percent > 100 {
                bail!("submission.refund_percent must be at most 100, got {}", percent);
            }
        }

        Ok(())
    }
}
