//! Error types for gridrisk
//!
//! ## Table of Contents
//! - **RiskError**: Main error enum covering all failure modes
//! - **Result**: Type alias for `Result<T, RiskError>`

use thiserror::Error;

/// Result type alias for gridrisk operations
pub type Result<T> = std::result::Result<T, RiskError>;

/// Main error type for gridrisk operations
#[derive(Error, Debug)]
pub enum RiskError {
    /// Configuration fault: invalid coordinates, malformed region or matrix,
    /// unknown event kind, bad listener registration. Fail fast, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// A pipeline stage read a pipe slot that no earlier stage populated
    #[error("missing pipeline input: {0}")]
    MissingInput(&'static str),

    /// A reader failed to produce data for a site (malformed or missing input)
    #[error("reader error: {0}")]
    Reader(String),

    /// Numeric fault: non-computable curve, degenerate domain, negative
    /// standard-deviation radicand
    #[error("numeric error: {0}")]
    Numeric(String),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error (should not occur in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl RiskError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a reader error
    pub fn reader(msg: impl Into<String>) -> Self {
        Self::Reader(msg.into())
    }

    /// Create a numeric error
    pub fn numeric(msg: impl Into<String>) -> Self {
        Self::Numeric(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
