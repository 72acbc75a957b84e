//! Error types for the relay strategy

use adapter_service::AdapterError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MevError>;

#[derive(Debug, Error)]
pub enum MevError {
    /// Invalid or missing settings. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payload construction aborted; nothing was produced
    #[error("Bundle build failed: {cause}")]
    BuildFailed {
        #[source]
        cause: Box<MevError>,
    },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Ledger query failed: {0}")]
    Ledger(String),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl MevError {
    pub fn build_failed(cause: MevError) -> Self {
        MevError::BuildFailed {
            cause: Box::new(cause),
        }
    }

    /// Check if this error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            MevError::BuildFailed { cause } => cause.is_recoverable(),
            MevError::Signing(_) | MevError::Ledger(_) => true,
            MevError::Adapter(e) => e.is_recoverable(),
            MevError::Configuration(_) | MevError::Cancelled => false,
        }
    }

    /// Check if this error indicates a permanent failure
    pub fn is_permanent(&self) -> bool {
        match self {
            MevError::Configuration(_) => true,
            MevError::BuildFailed { cause } => cause.is_permanent(),
            MevError::Adapter(e) => e.is_permanent(),
            _ => false,
        }
    }
}
