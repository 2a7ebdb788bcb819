//! Error types for the tombola chip ledger
//!
//! Closed taxonomy: every failure a caller can act on has its own variant,
//! collaborator-level I/O failures surface as opaque persistence errors.

use thiserror::Error;

/// Root error type for all tombola operations
#[derive(Debug, Error)]
pub enum TombolaError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Ledger store and wallet session errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A player-initiated debit would drive the balance below zero.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    /// The wallet identifier did not resolve. Most call sites react by
    /// lazily creating the wallet and retrying.
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Non-positive amount requested for a credit or debit. Rejected
    /// before any I/O happens.
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Durable store failed; no partial state was committed.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Corrupted record: {0}")]
    CorruptedData(String),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {0}")]
    MissingRequired(String),
}

impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        LedgerError::Persistence(e.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(e: bincode::Error) -> Self {
        LedgerError::CorruptedData(e.to_string())
    }
}

/// Convenience type alias for Results
pub type TombolaResult<T> = Result<T, TombolaError>;

pub type LedgerResult<T> = Result<T, LedgerError>;
