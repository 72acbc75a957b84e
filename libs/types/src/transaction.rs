//! Transaction value types shared by the feed, builder and relay channel

use crate::common::encoding::{decode_hex_array, encode_hex, HexBytes, HexError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 32-byte transaction content hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        decode_hex_array(s).map(Self)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        decode_hex_array(s).map(Self)
    }
}

impl FromStr for Address {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A pending transaction as observed on the mempool feed.
///
/// Immutable once received: the hash and the signed wire bytes are fixed at
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedTransaction {
    hash: TxHash,
    raw: HexBytes,
}

impl ObservedTransaction {
    pub fn new(hash: TxHash, raw: impl Into<HexBytes>) -> Self {
        Self {
            hash,
            raw: raw.into(),
        }
    }

    /// Content hash of the transaction
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Signed serialized transaction bytes
    pub fn raw(&self) -> &[u8] {
        self.raw.as_slice()
    }

    /// Wire form used when the transaction is placed in a bundle
    pub fn to_hex_bytes(&self) -> HexBytes {
        self.raw.clone()
    }
}

/// Intent handed to the signing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningRequest {
    pub to: Address,
    /// Value in wei
    pub value: u128,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    /// Legacy gas price in wei; left to the signer when absent
    pub gas_price: Option<u128>,
}

impl SigningRequest {
    pub fn transfer(to: Address, value: u128) -> Self {
        Self {
            to,
            value,
            nonce: None,
            gas_limit: None,
            gas_price: None,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }
}

/// Output of the signing service.
///
/// Not `Clone`: the bytes move into exactly one submission payload.
#[derive(Debug, PartialEq, Eq)]
pub struct SignedTransactionBytes(Vec<u8>);

impl SignedTransactionBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_hex_bytes(self) -> HexBytes {
        HexBytes(self.0)
    }
}
