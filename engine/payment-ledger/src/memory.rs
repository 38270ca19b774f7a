//! In-memory ledger implementation
//!
//! Used by the test suites and by the service's dev mode when no database
//! is configured.

use crate::error::LedgerResult;
use crate::order::{NewOrder, Order};
use crate::query::{LedgerPage, PageInfo, PageRequest, TransactionRow};
use crate::settlement::{AppendOutcome, NewSettlement, Settlement};
use crate::store::LedgerStore;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    orders: Vec<Order>,
    settlements: Vec<Settlement>,
    dedupe_keys: HashSet<String>,
}

/// In-memory ledger backed by a single mutex
#[derive(Default)]
pub struct InMemoryLedger {
    inner: Mutex<Inner>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedger {
    async fn create_order(&self, order: NewOrder) -> LedgerResult<Order> {
        let order = Order::from_new(order);
        let mut inner = self.inner.lock().await;
        inner.orders.push(order.clone());
        Ok(order)
    }

    async fn order_by_id(&self, id: Uuid) -> LedgerResult<Option<Order>> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_by_reference(&self, reference: &str) -> LedgerResult<Option<Order>> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.iter().find(|o| o.collect_reference == reference).cloned())
    }

    async fn orders_by_school(
        &self,
        school_id: &str,
        page: &PageRequest,
    ) -> LedgerResult<Vec<Order>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .orders
            .iter()
            .rev()
            .filter(|o| o.school_id == school_id)
            .skip(page.skip() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn update_order_gateway(&self, reference: &str, gateway: &str) -> LedgerResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(order) = inner.orders.iter_mut().find(|o| o.collect_reference == reference) {
            order.gateway_name = gateway.to_string();
        }
        Ok(())
    }

    async fn append_settlement(&self, settlement: NewSettlement) -> LedgerResult<AppendOutcome> {
        let key = settlement.dedupe_key();
        let mut inner = self.inner.lock().await;
        if !inner.dedupe_keys.insert(key) {
            return Ok(AppendOutcome::Duplicate);
        }
        let settlement = Settlement::from_new(settlement);
        inner.settlements.push(settlement.clone());
        Ok(AppendOutcome::Inserted(settlement))
    }

    async fn settlements_by_reference(&self, reference: &str) -> LedgerResult<Vec<Settlement>> {
        let inner = self.inner.lock().await;
        // Insertion order breaks created_at ties, newest append first
        Ok(inner
            .settlements
            .iter()
            .rev()
            .filter(|s| s.collect_reference == reference)
            .cloned()
            .collect())
    }

    async fn ledger_page(
        &self,
        school_id: Option<&str>,
        page: &PageRequest,
    ) -> LedgerResult<LedgerPage> {
        let inner = self.inner.lock().await;

        let orders_by_reference: HashMap<&str, &Order> =
            inner.orders.iter().map(|o| (o.collect_reference.as_str(), o)).collect();

        let mut rows: Vec<TransactionRow> = inner
            .settlements
            .iter()
            .filter_map(|s| {
                let order = orders_by_reference.get(s.collect_reference.as_str())?;
                if let Some(school) = school_id {
                    if order.school_id != school {
                        return None;
                    }
                }
                Some(TransactionRow {
                    collect_reference: s.collect_reference.clone(),
                    school_id: order.school_id.clone(),
                    gateway: order.gateway_name.clone(),
                    order_amount: s.order_amount,
                    transaction_amount: s.transaction_amount,
                    status: s.status.clone(),
                    payment_time: s.payment_time,
                    custom_order_id: order.id,
                })
            })
            .collect();

        rows.sort_by(|a, b| b.payment_time.cmp(&a.payment_time));

        let total = rows.len() as u64;
        let transactions = rows
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit as usize)
            .collect();

        Ok(LedgerPage { transactions, pagination: PageInfo::new(total, page) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::StudentInfo;
    use chrono::{Duration, Utc};

    fn new_order(reference: &str, school: &str) -> NewOrder {
        NewOrder {
            collect_reference: reference.to_string(),
            school_id: school.to_string(),
            trustee_id: "T1".to_string(),
            gateway_name: "razorpay".to_string(),
            student: StudentInfo {
                name: "Jane".to_string(),
                student_id: "ST9".to_string(),
                email: "jane@x.com".to_string(),
            },
        }
    }

    fn new_settlement(reference: &str, status: &str, minutes_ago: i64) -> NewSettlement {
        NewSettlement {
            collect_reference: reference.to_string(),
            order_amount: 500.0,
            transaction_amount: 500.0,
            payment_mode: Some("upi".to_string()),
            payment_details: None,
            bank_reference: None,
            payment_message: None,
            status: status.to_string(),
            error_message: None,
            payment_time: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[tokio::test]
    async fn create_order_assigns_a_unique_internal_id() {
        let ledger = InMemoryLedger::new();
        let a = ledger.create_order(new_order("CR1", "S1")).await.unwrap();
        let b = ledger.create_order(new_order("CR2", "S1")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(a.collect_reference, "CR1");
        assert_eq!(ledger.order_by_id(a.id).await.unwrap().unwrap().collect_reference, "CR1");
        assert!(ledger.order_by_reference("CR2").await.unwrap().is_some());
        assert!(ledger.order_by_reference("CR3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn gateway_overwrite_only_touches_the_matching_order() {
        let ledger = InMemoryLedger::new();
        ledger.create_order(new_order("CR1", "S1")).await.unwrap();
        ledger.create_order(new_order("CR2", "S1")).await.unwrap();

        ledger.update_order_gateway("CR1", "phonepe").await.unwrap();

        let updated = ledger.order_by_reference("CR1").await.unwrap().unwrap();
        let untouched = ledger.order_by_reference("CR2").await.unwrap().unwrap();
        assert_eq!(updated.gateway_name, "phonepe");
        assert_eq!(untouched.gateway_name, "razorpay");
    }

    #[tokio::test]
    async fn duplicate_settlement_append_is_a_no_op() {
        let ledger = InMemoryLedger::new();
        ledger.create_order(new_order("CR1", "S1")).await.unwrap();

        let settlement = new_settlement("CR1", "success", 5);
        let first = ledger.append_settlement(settlement.clone()).await.unwrap();
        let second = ledger.append_settlement(settlement).await.unwrap();

        assert!(first.is_inserted());
        assert!(matches!(second, AppendOutcome::Duplicate));
        assert_eq!(ledger.settlements_by_reference("CR1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn distinct_settlement_events_append_separately() {
        let ledger = InMemoryLedger::new();
        ledger.create_order(new_order("CR1", "S1")).await.unwrap();

        ledger.append_settlement(new_settlement("CR1", "pending", 10)).await.unwrap();
        ledger.append_settlement(new_settlement("CR1", "success", 5)).await.unwrap();

        let settlements = ledger.settlements_by_reference("CR1").await.unwrap();
        assert_eq!(settlements.len(), 2);
        // Newest append first, the deterministic "latest status" pick
        assert_eq!(settlements[0].status, "success");
    }

    #[tokio::test]
    async fn ledger_page_joins_settlements_to_their_orders() {
        let ledger = InMemoryLedger::new();
        let order = ledger.create_order(new_order("CR1", "S1")).await.unwrap();
        ledger.create_order(new_order("CR2", "S2")).await.unwrap();
        ledger.append_settlement(new_settlement("CR1", "success", 5)).await.unwrap();
        ledger.append_settlement(new_settlement("CR2", "failed", 1)).await.unwrap();

        let page = ledger.ledger_page(None, &PageRequest::default()).await.unwrap();
        assert_eq!(page.pagination.total, 2);
        // Sorted by payment time descending
        assert_eq!(page.transactions[0].collect_reference, "CR2");
        assert_eq!(page.transactions[1].custom_order_id, order.id);

        let scoped = ledger.ledger_page(Some("S1"), &PageRequest::default()).await.unwrap();
        assert_eq!(scoped.pagination.total, 1);
        assert_eq!(scoped.transactions[0].school_id, "S1");
    }

    #[tokio::test]
    async fn last_page_holds_the_remainder_and_beyond_is_empty() {
        let ledger = InMemoryLedger::new();
        for i in 0..7 {
            let reference = format!("CR{i}");
            ledger.create_order(new_order(&reference, "S1")).await.unwrap();
            ledger.append_settlement(new_settlement(&reference, "success", i)).await.unwrap();
        }

        let last = ledger
            .ledger_page(None, &PageRequest { page: 3, limit: 3 })
            .await
            .unwrap();
        assert_eq!(last.transactions.len(), 1);
        assert_eq!(last.pagination.total_pages, 3);

        let beyond = ledger
            .ledger_page(None, &PageRequest { page: 4, limit: 3 })
            .await
            .unwrap();
        assert!(beyond.transactions.is_empty());
        assert_eq!(beyond.pagination.total, 7);
    }

    #[tokio::test]
    async fn orders_by_school_scopes_and_paginates() {
        let ledger = InMemoryLedger::new();
        ledger.create_order(new_order("CR1", "S1")).await.unwrap();
        ledger.create_order(new_order("CR2", "S2")).await.unwrap();
        ledger.create_order(new_order("CR3", "S1")).await.unwrap();

        let orders = ledger.orders_by_school("S1", &PageRequest::default()).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.school_id == "S1"));
    }
}
