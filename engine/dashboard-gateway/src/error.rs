//! Error types for the DashboardGateway

use thiserror::Error;

/// Errors that can occur in the DashboardGateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for DashboardGateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
