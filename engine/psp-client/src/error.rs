//! Error types for the aggregator client

use thiserror::Error;

/// Result type alias for aggregator client operations
pub type PspResult<T> = std::result::Result<T, PspError>;

/// Errors that can occur when talking to the payment aggregator
#[derive(Error, Debug)]
pub enum PspError {
    /// Input rejected before any network call was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// The aggregator answered with a non-success status
    #[error("Aggregator error: {0}")]
    Upstream(String),

    /// Transport-level failure on the outbound call
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Payload signing failure
    #[error("Signing error: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The aggregator's response body did not match the expected shape
    #[error("Malformed aggregator response: {0}")]
    MalformedResponse(String),
}

impl PspError {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new upstream error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}
