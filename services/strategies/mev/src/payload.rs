//! Relay submission payloads
//!
//! Two request shapes share the relay socket:
//!
//! - `eth_sendPrivateRawTransaction` with a [`PrivateTransaction`]
//! - `eth_sendBundle` with a [`BundleSubmission`]
//!
//! Field names are camelCase on the wire. Raw transactions are `0x` hex.

use adapter_service::RelayRequest;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use types::HexBytes;

use crate::error::{MevError, Result};

pub const SEND_PRIVATE_TRANSACTION: &str = "eth_sendPrivateRawTransaction";
pub const SEND_BUNDLE: &str = "eth_sendBundle";

/// Block builder accepting private order flow
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockBuilder {
    Titan,
    Beaverbuild,
    Rsync,
    Flashbots,
    Other(String),
}

impl BlockBuilder {
    pub fn as_str(&self) -> &str {
        match self {
            BlockBuilder::Titan => "titan",
            BlockBuilder::Beaverbuild => "beaverbuild",
            BlockBuilder::Rsync => "rsync",
            BlockBuilder::Flashbots => "flashbots",
            BlockBuilder::Other(name) => name,
        }
    }

    /// Parse a list of builder names as found in configuration
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Vec<BlockBuilder> {
        names
            .iter()
            .map(|name| BlockBuilder::from(name.as_ref()))
            .collect()
    }
}

impl From<&str> for BlockBuilder {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "titan" => BlockBuilder::Titan,
            "beaverbuild" => BlockBuilder::Beaverbuild,
            "rsync" => BlockBuilder::Rsync,
            "flashbots" => BlockBuilder::Flashbots,
            other => BlockBuilder::Other(other.to_string()),
        }
    }
}

impl FromStr for BlockBuilder {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(BlockBuilder::from(s))
    }
}

impl fmt::Display for BlockBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BlockBuilder {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockBuilder {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(BlockBuilder::from(name.as_str()))
    }
}

/// Transactions carried by a private submission: `tx` for the single form, `txs` otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrivateTransactions {
    #[serde(rename = "tx")]
    Single(HexBytes),
    #[serde(rename = "txs")]
    Many(Vec<HexBytes>),
}

impl PrivateTransactions {
    pub fn as_slice(&self) -> &[HexBytes] {
        match self {
            PrivateTransactions::Single(tx) => std::slice::from_ref(tx),
            PrivateTransactions::Many(txs) => txs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateTransaction {
    #[serde(flatten)]
    pub transactions: PrivateTransactions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub use_public_mempool: bool,
    pub await_receipt: bool,
    pub await_receipt_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mev_builders: Option<Vec<BlockBuilder>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSubmission {
    /// Trigger first, then self-authored follow-ups in dependency order
    pub txs: Vec<HexBytes>,
    pub block_number: u64,
    pub use_public_mempool: bool,
    pub await_receipt: bool,
    pub await_receipt_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mev_builders: Option<Vec<BlockBuilder>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_index: Option<u32>,
}

/// One relay submission. Serializes as the bare payload object; the method
/// name travels in the surrounding [`RelayRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubmissionPayload {
    Private(PrivateTransaction),
    Bundle(BundleSubmission),
}

impl SubmissionPayload {
    pub fn method(&self) -> &'static str {
        match self {
            SubmissionPayload::Private(_) => SEND_PRIVATE_TRANSACTION,
            SubmissionPayload::Bundle(_) => SEND_BUNDLE,
        }
    }

    /// Receipt window when the relay was asked to report one
    pub fn receipt_timeout(&self) -> Option<Duration> {
        let (await_receipt, timeout_ms) = match self {
            SubmissionPayload::Private(p) => (p.await_receipt, p.await_receipt_timeout_ms),
            SubmissionPayload::Bundle(b) => (b.await_receipt, b.await_receipt_timeout_ms),
        };
        await_receipt.then(|| Duration::from_millis(timeout_ms))
    }

    pub fn transactions(&self) -> &[HexBytes] {
        match self {
            SubmissionPayload::Private(p) => p.transactions.as_slice(),
            SubmissionPayload::Bundle(b) => &b.txs,
        }
    }

    pub fn target_block(&self) -> Option<u64> {
        match self {
            SubmissionPayload::Private(p) => p.block_number,
            SubmissionPayload::Bundle(b) => Some(b.block_number),
        }
    }

    pub fn into_request(self, id: u64) -> RelayRequest<SubmissionPayload> {
        RelayRequest::new(id, self.method(), self)
    }

    /// Decode a payload using the method name to pick the shape
    pub fn from_request(request: RelayRequest<Value>) -> Result<Self> {
        let method = request.method.clone();
        let params = request.into_payload();
        let decoded = match method.as_str() {
            SEND_PRIVATE_TRANSACTION => serde_json::from_value(params).map(SubmissionPayload::Private),
            SEND_BUNDLE => serde_json::from_value(params).map(SubmissionPayload::Bundle),
            other => {
                return Err(MevError::Configuration(format!(
                    "Unknown submission method '{}'",
                    other
                )))
            }
        };
        decoded.map_err(|e| MevError::Adapter(e.into()))
    }
}
