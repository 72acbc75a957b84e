//! JSON-RPC 2.0 envelope for relay submissions and classification of inbound frames

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Protocol version tag carried on every request
pub const JSONRPC_VERSION: &str = "2.0";

/// Outbound request: `{"id", "jsonrpc", "method", "params": [payload]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest<P> {
    /// Correlation id, unique per connection lifetime
    pub id: u64,
    /// Always `"2.0"`
    pub jsonrpc: String,
    /// RPC method name
    pub method: String,
    /// Single-element parameter list
    pub params: [P; 1],
}

impl<P> RelayRequest<P> {
    /// Wrap `payload` as the sole parameter of `method`
    pub fn new(id: u64, method: impl Into<String>, payload: P) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: [payload],
        }
    }

    /// The wrapped payload
    pub fn payload(&self) -> &P {
        &self.params[0]
    }

    /// Consume the envelope, returning the payload
    pub fn into_payload(self) -> P {
        let [payload] = self.params;
        payload
    }
}

/// Monotonic request id source starting at 1
#[derive(Debug)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Fresh generator; the first id handed out is 1
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next id
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// An inbound relay frame after JSON parsing
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// `{"receiptNotification": ...}`, with the request id when one is embedded
    Receipt {
        /// Correlation id found beside or inside the notification
        id: Option<u64>,
        /// Notification body
        receipt: Value,
    },
    /// `{"id", "result"}`
    Response {
        /// Request id being answered
        id: u64,
        /// Result value
        result: Value,
    },
    /// `{"id", "error": {"code", "message"}}`
    ErrorResponse {
        /// Request id being answered
        id: u64,
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },
    /// Valid JSON with no recognised shape
    Other(Value),
}

impl InboundFrame {
    /// Parse and classify a text frame
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::classify(value))
    }

    /// Classify an already-parsed frame
    pub fn classify(mut value: Value) -> Self {
        let top_level_id = value.get("id").and_then(Value::as_u64);

        if let Some(receipt) = value.get_mut("receiptNotification").map(Value::take) {
            let id = top_level_id.or_else(|| receipt.get("id").and_then(Value::as_u64));
            return InboundFrame::Receipt { id, receipt };
        }

        let Some(id) = top_level_id else {
            return InboundFrame::Other(value);
        };

        if let Some(error) = value.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return InboundFrame::ErrorResponse { id, code, message };
        }

        match value.get_mut("result").map(Value::take) {
            Some(result) => InboundFrame::Response { id, result },
            None => InboundFrame::Other(value),
        }
    }

    /// Request id this frame refers to, if any
    pub fn id(&self) -> Option<u64> {
        match self {
            InboundFrame::Receipt { id, .. } => *id,
            InboundFrame::Response { id, .. } | InboundFrame::ErrorResponse { id, .. } => Some(*id),
            InboundFrame::Other(_) => None,
        }
    }
}
