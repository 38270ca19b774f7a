//! Websocket server for dashboard sessions
//!
//! Sessions connect and disconnect independently of the order lifecycle;
//! the server only registers each connection with the broadcaster and
//! forwards outbound frames. No client-initiated messages are part of the
//! contract, so inbound text is ignored.

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::transaction_broadcaster::TransactionBroadcaster;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Accepts dashboard websocket connections and wires each one to the
/// transaction broadcaster
pub struct WsServer {
    config: GatewayConfig,
    broadcaster: Arc<TransactionBroadcaster>,
}

impl WsServer {
    /// Create a websocket server over the shared broadcaster
    pub fn new(config: GatewayConfig, broadcaster: Arc<TransactionBroadcaster>) -> Self {
        Self { config, broadcaster }
    }

    /// Run the accept loop
    pub async fn start(&self) -> GatewayResult<()> {
        let addr = self
            .config
            .websocket_addr()
            .map_err(|e| GatewayError::Config(format!("Invalid websocket address: {e}")))?;

        let listener = TcpListener::bind(addr).await?;
        info!("Realtime channel listening on {}", addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    if self.broadcaster.session_count().await >= self.config.websocket.max_sessions
                    {
                        warn!("Session limit reached, rejecting connection from {}", peer_addr);
                        continue;
                    }

                    let broadcaster = self.broadcaster.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_session(stream, peer_addr, broadcaster).await {
                            error!("Dashboard session from {} failed: {}", peer_addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept websocket connection: {}", e);
                }
            }
        }
    }
}

/// Handle one dashboard session from accept to close
async fn handle_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    broadcaster: Arc<TransactionBroadcaster>,
) -> GatewayResult<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let session_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    broadcaster.add_session(session_id, tx).await;
    info!("Dashboard session {} connected from {}", session_id, peer_addr);

    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                debug!("Dashboard session send failed: {}", e);
                break;
            }
        }
    });

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                // Keepalive handled by tungstenite
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {
                // The realtime channel is push-only
                debug!("Ignoring inbound frame from session {}", session_id);
            }
            Err(e) => {
                debug!("Dashboard session {} errored: {}", session_id, e);
                break;
            }
        }
    }

    broadcaster.remove_session(&session_id).await;
    sender_task.abort();
    info!("Dashboard session {} disconnected", session_id);
    Ok(())
}
