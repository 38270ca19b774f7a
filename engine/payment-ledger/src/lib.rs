//! Payment ledger - durable records of collection orders and their settlements
//!
//! An `Order` records that a collection was requested; a `Settlement` records
//! one outcome the aggregator reported for it. The two are correlated by the
//! aggregator-assigned collection reference, a soft foreign key: webhook
//! arrival and order creation are temporally decoupled, so the stores never
//! enforce the relationship transactionally across consistency domains.

pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod query;
pub mod settlement;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;
pub use order::{NewOrder, Order, StudentInfo};
pub use postgres::PostgresLedger;
pub use query::{LedgerPage, PageInfo, PageRequest, TransactionRow};
pub use settlement::{AppendOutcome, NewSettlement, Settlement};
pub use store::LedgerStore;
