//! Collect Service
//!
//! Main entry point for the school-fee collection platform: wires the
//! aggregator client, the ledger stores, the reconciliation handler, the
//! REST API and the realtime channel, then serves until shutdown.

mod config;

use anyhow::{Context, Result};
use config::ServiceConfig;
use dashboard_gateway::rest_api::{self, AppContext};
use dashboard_gateway::{DashboardAuth, TransactionBroadcaster, WsServer};
use payment_ledger::{InMemoryLedger, LedgerStore, PostgresLedger};
use psp_client::{AggregatorClient, Signer};
use reconciliation::{event, Reconciler};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "collect-service.toml";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting Collect Service v{}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load(CONFIG_PATH).context("Failed to load configuration")?;

    // Ledger store: Postgres in production, in-memory for development
    let store: Arc<dyn LedgerStore> = match &config.database.url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(url)
                .await
                .context("Failed to connect to database")?;
            sqlx::raw_sql(include_str!("../../payment-ledger/schema.sql"))
                .execute(&pool)
                .await
                .context("Failed to apply ledger schema")?;
            info!("Connected to database");
            Arc::new(PostgresLedger::new(pool))
        }
        None => {
            warn!("No DATABASE_URL configured, running on the in-memory ledger");
            Arc::new(InMemoryLedger::new())
        }
    };

    // Reconciliation publishes onto this channel; the websocket forwarder
    // is the only subscriber
    let (events, events_rx) = event::transaction_channel(event::DEFAULT_EVENT_CAPACITY);
    let reconciler = Arc::new(Reconciler::new(store.clone(), events));

    let signer = Signer::new(&config.psp.pg_key);
    let psp = Arc::new(AggregatorClient::new(config.psp.clone(), signer));

    let ctx = AppContext {
        store,
        psp,
        reconciler,
        auth: DashboardAuth::new(&config.gateway.auth.jwt_secret),
    };
    let routes = rest_api::create_routes(ctx);

    // Realtime fan-out
    let broadcaster = Arc::new(TransactionBroadcaster::new());
    let _forwarder = broadcaster.spawn_forwarder(events_rx);
    let ws_server = WsServer::new(config.gateway.clone(), broadcaster);
    let _ws_handle = tokio::spawn(async move {
        if let Err(e) = ws_server.start().await {
            error!("Realtime channel failed: {}", e);
        }
    });

    let addr = config.gateway.server_addr().context("Invalid server address")?;
    info!("REST API listening on {}", addr);
    warp::serve(routes).run(addr).await;

    Ok(())
}
