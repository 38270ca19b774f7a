//! Error types for reconciliation

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;

/// Errors that can occur while applying a settlement notification
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The notification references a collection no order was placed for.
    /// Definitive rejection: the notification can never succeed, so no
    /// settlement is written.
    #[error("No order placed for collection reference {0}")]
    UnknownOrder(String),

    /// Storage failure anywhere in the handler; the whole notification
    /// counts as unprocessed
    #[error("Ledger error: {0}")]
    Ledger(#[from] payment_ledger::LedgerError),
}
