//! Error types for kvconsole
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::model::Mode;

/// Result type alias using ConsoleError
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Unified error type for kvconsole operations
#[derive(Debug, Error)]
pub enum ConsoleError {
    // -------------------------------------------------------------------------
    // Client Availability
    // -------------------------------------------------------------------------
    #[error("{0} client not initialized")]
    Unavailable(Mode),

    #[error("Connect error: {0}")]
    Connect(String),

    #[error("Client handle closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Key Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    NotFound,

    #[error("Key already exists")]
    AlreadyExists,

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Validation error: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // Operation Errors
    // -------------------------------------------------------------------------
    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Transaction failed: {0}")]
    TxnFailed(String),

    #[error("Sweep aborted after deleting {deleted} keys: {cause}")]
    SweepAborted {
        deleted: usize,
        cause: Box<ConsoleError>,
    },

    // -------------------------------------------------------------------------
    // Backend Errors
    // -------------------------------------------------------------------------
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Write conflict: {0}")]
    Conflict(String),

    // -------------------------------------------------------------------------
    // I/O and Wire Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Whether the caller may retry the request unchanged.
    ///
    /// Only a missing client is retryable, and only after a successful
    /// reconfiguration. Nothing at this layer retries automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsoleError::Unavailable(_) | ConsoleError::Closed)
    }

    /// Wrap a backend failure as a scan failure, keeping the cause text.
    pub(crate) fn into_scan_failure(self) -> ConsoleError {
        match self {
            e @ (ConsoleError::Unavailable(_) | ConsoleError::ScanFailed(_)) => e,
            other => ConsoleError::ScanFailed(other.to_string()),
        }
    }

    /// Wrap a backend failure as a transaction failure, keeping the cause text.
    ///
    /// Key-level outcomes (`NotFound`, `AlreadyExists`) and request errors pass
    /// through untouched so callers can still map them.
    pub(crate) fn into_txn_failure(self) -> ConsoleError {
        match self {
            e @ (ConsoleError::Unavailable(_)
            | ConsoleError::NotFound
            | ConsoleError::AlreadyExists
            | ConsoleError::Validation(_)
            | ConsoleError::TxnFailed(_)) => e,
            other => ConsoleError::TxnFailed(other.to_string()),
        }
    }
}

impl From<bincode::Error> for ConsoleError {
    fn from(err: bincode::Error) -> Self {
        ConsoleError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Serialization(err.to_string())
    }
}
