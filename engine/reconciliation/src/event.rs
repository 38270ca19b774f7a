//! Normalized transaction events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Normalized settlement event handed to the realtime notifier after a
/// successful reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub collect_reference: String,
    pub school_id: String,
    pub gateway: String,
    pub order_amount: f64,
    pub transaction_amount: f64,
    pub status: String,
    pub payment_time: DateTime<Utc>,
    pub custom_order_id: Uuid,
}

/// Default buffer for the transaction event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Create the broadcast channel connecting reconciliation to the realtime
/// transport. Events are fire-and-forget: sessions that connect later have
/// no way to retrieve missed events except the ordinary paginated read.
pub fn transaction_channel(
    capacity: usize,
) -> (broadcast::Sender<TransactionEvent>, broadcast::Receiver<TransactionEvent>) {
    broadcast::channel(capacity)
}
