//! Configuration for the aggregator client

use serde::{Deserialize, Serialize};

/// Credentials and endpoints for the payment aggregator.
///
/// Injected at construction so tests can substitute fixtures without
/// touching process-wide environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PspConfig {
    /// Base URL of the aggregator's ERP API
    pub base_url: String,

    /// API credential sent as a bearer token on every outbound call
    pub api_key: String,

    /// Shared signing key for request payloads
    pub pg_key: String,

    /// Callback URL the aggregator redirects to after payment
    pub callback_url: String,
}

impl Default for PspConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dev-vanilla.edviron.com/erp".to_string(),
            api_key: String::new(),
            pg_key: String::new(),
            callback_url: "http://localhost:3000/payment-callback".to_string(),
        }
    }
}
