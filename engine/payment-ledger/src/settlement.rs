//! Settlement records - outcomes the aggregator reported for a collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A settlement as carried by a webhook notification, before persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSettlement {
    /// Join key matching an order's collection reference
    pub collect_reference: String,

    pub order_amount: f64,

    pub transaction_amount: f64,

    pub payment_mode: Option<String>,

    pub payment_details: Option<String>,

    pub bank_reference: Option<String>,

    pub payment_message: Option<String>,

    /// Open enumeration (pending/success/failed/...); the aggregator may
    /// introduce new values, so this stays an opaque string
    pub status: String,

    pub error_message: Option<String>,

    pub payment_time: DateTime<Utc>,
}

impl NewSettlement {
    /// Key used for insert-if-absent deduplication of re-delivered
    /// notifications. Two notifications describing the same real-world
    /// settlement event share reference, payment time and status.
    pub fn dedupe_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.collect_reference,
            self.payment_time.to_rfc3339(),
            self.status
        )
    }
}

/// A persisted settlement; append-only, never updated or deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub collect_reference: String,
    pub order_amount: f64,
    pub transaction_amount: f64,
    pub payment_mode: Option<String>,
    pub payment_details: Option<String>,
    pub bank_reference: Option<String>,
    pub payment_message: Option<String>,
    pub status: String,
    pub error_message: Option<String>,
    pub payment_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Materialize a settlement from a notification
    pub fn from_new(new: NewSettlement) -> Self {
        Self {
            collect_reference: new.collect_reference,
            order_amount: new.order_amount,
            transaction_amount: new.transaction_amount,
            payment_mode: new.payment_mode,
            payment_details: new.payment_details,
            bank_reference: new.bank_reference,
            payment_message: new.payment_message,
            status: new.status,
            error_message: new.error_message,
            payment_time: new.payment_time,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a conditional settlement append
#[derive(Debug, Clone)]
pub enum AppendOutcome {
    /// A new settlement row was written
    Inserted(Settlement),

    /// A settlement with the same dedupe key already exists; nothing was
    /// written
    Duplicate,
}

impl AppendOutcome {
    /// Whether the append wrote a new row
    pub fn is_inserted(&self) -> bool {
        matches!(self, AppendOutcome::Inserted(_))
    }
}
