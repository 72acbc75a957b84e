//! Error types for the adapters module

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Main error type for adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Transport-level failure while establishing a connection
    #[error("Connection failed for {endpoint}: {reason}")]
    ConnectionFailed {
        /// The endpoint that failed to connect
        endpoint: String,
        /// Reason for the failure
        reason: String,
    },

    /// Handshake did not complete within the readiness window
    #[error("Connection to {endpoint} not ready after {timeout_ms}ms")]
    ReadyTimeout {
        /// The endpoint that timed out
        endpoint: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// Handshake rejected with HTTP 401/403
    #[error("Authentication failed for {endpoint} (HTTP {status})")]
    AuthenticationFailed {
        /// The endpoint where auth failed
        endpoint: String,
        /// HTTP status returned by the server
        status: u16,
    },

    /// Established connection dropped
    #[error("Connection lost for {endpoint}: {reason:?}")]
    ConnectionLost {
        /// The endpoint whose connection dropped
        endpoint: String,
        /// Optional reason for the drop
        reason: Option<String>,
    },

    /// Outbound send failed or the channel is already closed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation interrupted by shutdown
    #[error("Operation cancelled")]
    Cancelled,

    /// Inbound frame did not have the expected shape
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    /// JSON parsing error
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Configuration error in adapter settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AdapterError {
    /// Check if this error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AdapterError::ConnectionFailed { .. }
                | AdapterError::ReadyTimeout { .. }
                | AdapterError::ConnectionLost { .. }
                | AdapterError::Transport(_)
                | AdapterError::InvalidMessage(_)
                | AdapterError::JsonParse(_)
                | AdapterError::WebSocket(_)
        )
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AdapterError::AuthenticationFailed { .. } | AdapterError::Configuration(_)
        )
    }

    /// Check if this error ends a streaming session
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, AdapterError::ConnectionLost { .. })
    }
}
