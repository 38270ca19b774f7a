//! Error types for the payment ledger

use thiserror::Error;

/// Result type alias for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in the ledger stores. Absent rows are not errors
/// here; lookups return `Option` and callers decide what missing means.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Database-level failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
