//! Ledger store trait

use crate::error::LedgerResult;
use crate::order::{NewOrder, Order};
use crate::query::{LedgerPage, PageRequest};
use crate::settlement::{AppendOutcome, NewSettlement, Settlement};
use uuid::Uuid;

/// Abstract trait over the order and settlement stores.
///
/// All mutation is single-row insert or a single-field update, so
/// concurrent writers to different rows never conflict. Nothing here takes
/// a lock across a read-then-write sequence; duplicate webhook deliveries
/// are collapsed by the dedupe key on `append_settlement`, not by
/// serializing callers.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persist a new order, assigning its internal identifier
    async fn create_order(&self, order: NewOrder) -> LedgerResult<Order>;

    /// Point lookup by internal identifier
    async fn order_by_id(&self, id: Uuid) -> LedgerResult<Option<Order>>;

    /// Point lookup by the aggregator's collection reference
    async fn order_by_reference(&self, reference: &str) -> LedgerResult<Option<Order>>;

    /// Orders for one school, newest first
    async fn orders_by_school(
        &self,
        school_id: &str,
        page: &PageRequest,
    ) -> LedgerResult<Vec<Order>>;

    /// Overwrite the order's gateway name with the gateway the aggregator
    /// reports actually settled the payment
    async fn update_order_gateway(&self, reference: &str, gateway: &str) -> LedgerResult<()>;

    /// Insert a settlement unless one with the same dedupe key exists
    async fn append_settlement(&self, settlement: NewSettlement) -> LedgerResult<AppendOutcome>;

    /// All settlements recorded for a collection reference, newest
    /// `created_at` first; callers wanting the latest status take the head
    async fn settlements_by_reference(&self, reference: &str) -> LedgerResult<Vec<Settlement>>;

    /// One page of the Order-Settlement join, sorted by payment time
    /// descending, optionally scoped to one school
    async fn ledger_page(
        &self,
        school_id: Option<&str>,
        page: &PageRequest,
    ) -> LedgerResult<LedgerPage>;
}
