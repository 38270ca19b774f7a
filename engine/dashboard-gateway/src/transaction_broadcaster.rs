//! Transaction event broadcasting for the DashboardGateway

use crate::error::GatewayError;
use reconciliation::TransactionEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Fans reconciled settlement events out to every connected dashboard
/// session.
///
/// No persistence and no delivery guarantee: a session that connects after
/// a broadcast catches up through the paginated ledger read, and slow
/// consumers are the transport's problem.
pub struct TransactionBroadcaster {
    /// Connected sessions (session id -> websocket sender)
    sessions: Arc<RwLock<HashMap<Uuid, mpsc::UnboundedSender<Message>>>>,
}

impl Default for TransactionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionBroadcaster {
    /// Create a new broadcaster with no sessions
    pub fn new() -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Register a dashboard session to receive transaction events
    pub async fn add_session(&self, session_id: Uuid, sender: mpsc::UnboundedSender<Message>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, sender);
    }

    /// Deregister a session
    pub async fn remove_session(&self, session_id: &Uuid) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }

    /// Number of connected sessions
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Push one transaction event to every connected session, evicting
    /// sessions whose channel has gone away
    pub async fn broadcast(&self, event: &TransactionEvent) -> Result<(), GatewayError> {
        let frame = serde_json::json!({
            "event": "transaction",
            "data": event
        });
        let message = Message::Text(serde_json::to_string(&frame)?);

        let sessions = self.sessions.read().await;
        if sessions.is_empty() {
            debug!("No dashboard sessions connected, dropping transaction event");
            return Ok(());
        }

        let mut stale = Vec::new();
        for (session_id, sender) in sessions.iter() {
            if sender.send(message.clone()).is_err() {
                stale.push(*session_id);
            }
        }
        drop(sessions);

        if !stale.is_empty() {
            let mut sessions = self.sessions.write().await;
            for session_id in stale {
                sessions.remove(&session_id);
            }
        }

        Ok(())
    }

    /// Spawn the task bridging the reconciliation event channel to the
    /// connected sessions. Fire-and-forget: lagging behind the channel
    /// skips events rather than blocking reconciliation.
    pub fn spawn_forwarder(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<TransactionEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let broadcaster = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(e) = broadcaster.broadcast(&event).await {
                            error!("Transaction broadcast failed: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Realtime forwarder lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
