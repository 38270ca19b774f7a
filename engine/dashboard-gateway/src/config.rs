//! Configuration for the DashboardGateway

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for the DashboardGateway
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// REST server configuration
    pub server: ServerConfig,

    /// Realtime channel configuration
    pub websocket: WebsocketConfig,

    /// Authentication configuration
    pub auth: AuthConfig,
}

/// REST server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Realtime channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebsocketConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Maximum number of concurrent dashboard sessions
    pub max_sessions: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret the login service signs dashboard tokens with
    pub jwt_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5001, max_sessions: 1024 }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { jwt_secret: String::new() }
    }
}

impl GatewayConfig {
    /// Get the REST server address
    pub fn server_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    /// Get the websocket server address
    pub fn websocket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.websocket.host, self.websocket.port).parse()
    }
}
