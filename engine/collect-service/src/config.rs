//! Service configuration management

use anyhow::{Context, Result};
use dashboard_gateway::GatewayConfig;
use psp_client::PspConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// REST, websocket and auth configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Aggregator credentials and endpoints
    #[serde(default)]
    pub psp: PspConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string; when absent the service runs on the
    /// in-memory ledger (development mode, nothing survives a restart)
    pub url: Option<String>,

    /// Connection pool size
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: 5 }
    }
}

impl ServiceConfig {
    /// Load configuration from the TOML file (when present) and apply
    /// environment overrides. Secrets come from the environment in
    /// production deployments.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {path}"))?;
            let config: ServiceConfig =
                toml::from_str(&content).with_context(|| format!("Failed to parse {path}"))?;
            info!("Loaded configuration from {}", path);
            config
        } else {
            info!("No configuration file at {}, using defaults", path);
            ServiceConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.gateway.auth.jwt_secret = secret;
        }
        if let Ok(key) = std::env::var("PG_KEY") {
            self.psp.pg_key = key;
        }
        if let Ok(key) = std::env::var("API_KEY") {
            self.psp.api_key = key;
        }
        if let Ok(url) = std::env::var("PSP_BASE_URL") {
            self.psp.base_url = url;
        }
        if let Ok(url) = std::env::var("CALLBACK_URL") {
            self.psp.callback_url = url;
        }
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.server.port = port;
            }
        }
        if let Ok(port) = std::env::var("WS_PORT") {
            if let Ok(port) = port.parse() {
                self.gateway.websocket.port = port;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip_preserves_the_shape() {
        let config = ServiceConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: ServiceConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.gateway.server.port, config.gateway.server.port);
        assert_eq!(parsed.database.max_connections, config.database.max_connections);
    }
}
