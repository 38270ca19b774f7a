//! DashboardGateway - REST and realtime API for the collection dashboard
//!
//! Serves the authenticated transaction endpoints, the unauthenticated
//! webhook receiver, and the websocket channel that pushes reconciled
//! settlements to connected dashboard sessions as they happen.

pub mod auth;
pub mod config;
pub mod error;
pub mod rest_api;
pub mod transaction_broadcaster;
pub mod ws_server;

pub use auth::DashboardAuth;
pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use rest_api::AppContext;
pub use transaction_broadcaster::TransactionBroadcaster;
pub use ws_server::WsServer;
