//! Error types for the KOL scanner

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the KOL scanner
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Input errors
    #[error("No wallets provided")]
    NoWalletsProvided,

    #[error("Invalid wallet address: {0:?}")]
    InvalidWallet(String),

    // Fetch errors
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Upstream returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    // Scoring errors
    #[error("Insufficient transaction history for wallet {0}")]
    InsufficientHistory(String),

    #[error("Model error: {0}")]
    Model(String),

    // Orchestration
    #[error("Analysis cancelled")]
    Cancelled,

    // Payload errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Check if this error came from reading an upstream source
    /// (transport, status, payload or timeout)
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::HttpStatus { .. } | Error::Timeout(_) | Error::Deserialization(_)
        )
    }
}
