//! Webhook reconciliation handler

use crate::error::{ReconcileError, ReconcileResult};
use crate::event::TransactionEvent;
use chrono::{DateTime, Utc};
use payment_ledger::{LedgerStore, NewSettlement};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Inbound webhook body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub order_info: OrderInfo,
}

/// Settlement details carried by a notification. `order_id` is the
/// aggregator's collection reference, not our internal order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_id: String,
    #[serde(default)]
    pub order_amount: f64,
    #[serde(default)]
    pub transaction_amount: f64,
    #[serde(default)]
    pub payment_mode: Option<String>,
    #[serde(default)]
    pub payment_details: Option<String>,
    #[serde(default)]
    pub bank_reference: Option<String>,
    #[serde(default)]
    pub payment_message: Option<String>,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Absent in some historical notification shapes; receipt time is used
    /// as the fallback, matching the stored default of the original schema
    #[serde(default)]
    pub payment_time: Option<DateTime<Utc>>,
    /// The sub-gateway that actually settled the payment; the aggregator
    /// is authoritative here and may differ from what was requested
    pub gateway: String,
}

/// Result of applying one notification
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub event: TransactionEvent,

    /// True when the notification was a re-delivery of an already-applied
    /// settlement event; no settlement row was written and nothing was
    /// broadcast, though the gateway overwrite was reapplied
    pub duplicate: bool,
}

/// Applies settlement notifications to the ledger.
///
/// One verdict per call: either every durable effect happened and the
/// caller gets success, or nothing did and the caller gets the error. A
/// re-delivery after a mid-handler failure re-runs all steps; the dedupe
/// key keeps the settlement append idempotent across such retries.
pub struct Reconciler {
    store: Arc<dyn LedgerStore>,
    events: broadcast::Sender<TransactionEvent>,
}

impl Reconciler {
    /// Create a reconciler over a ledger store and the event channel
    pub fn new(store: Arc<dyn LedgerStore>, events: broadcast::Sender<TransactionEvent>) -> Self {
        Self { store, events }
    }

    /// Apply one settlement notification.
    ///
    /// Steps: resolve the order by collection reference (absent: reject,
    /// never create an orphan settlement), append the settlement behind the
    /// dedupe key, overwrite the order's gateway with the reported one, and
    /// publish the normalized event. The gateway overwrite runs even when
    /// the append was a duplicate, so a retry of a partially applied
    /// notification still converges; only the broadcast is skipped for
    /// duplicates, it is best-effort and not part of the durability
    /// contract.
    pub async fn apply(&self, notification: WebhookNotification) -> ReconcileResult<ReconcileOutcome> {
        let info = notification.order_info;

        let order = self
            .store
            .order_by_reference(&info.order_id)
            .await?
            .ok_or_else(|| ReconcileError::UnknownOrder(info.order_id.clone()))?;

        let payment_time = info.payment_time.unwrap_or_else(Utc::now);

        let settlement = NewSettlement {
            collect_reference: info.order_id.clone(),
            order_amount: info.order_amount,
            transaction_amount: info.transaction_amount,
            payment_mode: info.payment_mode,
            payment_details: info.payment_details,
            bank_reference: info.bank_reference,
            payment_message: info.payment_message,
            status: info.status.clone(),
            error_message: info.error_message,
            payment_time,
        };

        let event = TransactionEvent {
            collect_reference: info.order_id.clone(),
            school_id: order.school_id.clone(),
            gateway: info.gateway.clone(),
            order_amount: info.order_amount,
            transaction_amount: info.transaction_amount,
            status: info.status.clone(),
            payment_time,
            custom_order_id: order.id,
        };

        let inserted = self.store.append_settlement(settlement).await?.is_inserted();

        // Runs on re-deliveries too: a retry after a failure between the
        // append and this update must still converge the gateway name
        self.store.update_order_gateway(&info.order_id, &info.gateway).await?;

        if !inserted {
            debug!(
                "Duplicate settlement notification for {}, already applied",
                info.order_id
            );
            return Ok(ReconcileOutcome { event, duplicate: true });
        }

        // Zero connected dashboard sessions is not a failure
        if self.events.send(event.clone()).is_err() {
            warn!("No realtime subscribers for transaction event {}", info.order_id);
        }

        info!(
            "Reconciled settlement for {} with status {}",
            info.order_id, info.status
        );

        Ok(ReconcileOutcome { event, duplicate: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::transaction_channel;
    use payment_ledger::{
        AppendOutcome, InMemoryLedger, LedgerError, LedgerPage, LedgerResult, NewOrder, Order,
        PageRequest, Settlement, StudentInfo,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    fn order_fixture(reference: &str) -> NewOrder {
        NewOrder {
            collect_reference: reference.to_string(),
            school_id: "S1".to_string(),
            trustee_id: "T1".to_string(),
            gateway_name: "razorpay".to_string(),
            student: StudentInfo {
                name: "Jane".to_string(),
                student_id: "ST9".to_string(),
                email: "jane@x.com".to_string(),
            },
        }
    }

    fn notification(reference: &str, status: &str, gateway: &str) -> WebhookNotification {
        WebhookNotification {
            order_info: OrderInfo {
                order_id: reference.to_string(),
                order_amount: 500.0,
                transaction_amount: 500.0,
                payment_mode: Some("upi".to_string()),
                payment_details: None,
                bank_reference: None,
                payment_message: None,
                status: status.to_string(),
                error_message: None,
                payment_time: Some("2024-01-01T00:00:00Z".parse().unwrap()),
                gateway: gateway.to_string(),
            },
        }
    }

    async fn setup() -> (Arc<InMemoryLedger>, Reconciler, broadcast::Receiver<TransactionEvent>) {
        let store = Arc::new(InMemoryLedger::new());
        let (tx, rx) = transaction_channel(16);
        let reconciler = Reconciler::new(store.clone(), tx);
        (store, reconciler, rx)
    }

    #[tokio::test]
    async fn settlement_joins_to_its_order_and_broadcasts() {
        let (store, reconciler, mut rx) = setup().await;
        let order = store.create_order(order_fixture("CR1")).await.unwrap();

        let outcome =
            reconciler.apply(notification("CR1", "success", "razorpay")).await.unwrap();

        assert!(!outcome.duplicate);
        assert_eq!(outcome.event.custom_order_id, order.id);
        assert_eq!(outcome.event.school_id, "S1");

        let settlements = store.settlements_by_reference("CR1").await.unwrap();
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].status, "success");

        let event = rx.try_recv().unwrap();
        assert_eq!(event.status, "success");
        assert_eq!(event.collect_reference, "CR1");
    }

    #[tokio::test]
    async fn unknown_reference_is_rejected_without_an_orphan_settlement() {
        let (store, reconciler, _rx) = setup().await;

        let err = reconciler
            .apply(notification("CR-unknown", "success", "razorpay"))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::UnknownOrder(_)));
        assert!(store.settlements_by_reference("CR-unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reported_gateway_overwrites_the_requested_one() {
        let (store, reconciler, _rx) = setup().await;
        store.create_order(order_fixture("CR1")).await.unwrap();

        reconciler.apply(notification("CR1", "success", "phonepe")).await.unwrap();

        let order = store.order_by_reference("CR1").await.unwrap().unwrap();
        assert_eq!(order.gateway_name, "phonepe");
    }

    #[tokio::test]
    async fn duplicate_delivery_writes_once_and_broadcasts_once() {
        let (store, reconciler, mut rx) = setup().await;
        store.create_order(order_fixture("CR1")).await.unwrap();

        let first = reconciler.apply(notification("CR1", "success", "razorpay")).await.unwrap();
        let second = reconciler.apply(notification("CR1", "success", "razorpay")).await.unwrap();

        assert!(!first.duplicate);
        assert!(second.duplicate);
        assert_eq!(store.settlements_by_reference("CR1").await.unwrap().len(), 1);

        rx.try_recv().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn renotification_with_new_status_appends_a_distinct_settlement() {
        let (store, reconciler, _rx) = setup().await;
        store.create_order(order_fixture("CR1")).await.unwrap();

        reconciler.apply(notification("CR1", "pending", "razorpay")).await.unwrap();
        reconciler.apply(notification("CR1", "success", "razorpay")).await.unwrap();

        let settlements = store.settlements_by_reference("CR1").await.unwrap();
        assert_eq!(settlements.len(), 2);
        assert_eq!(settlements[0].status, "success");
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_still_succeeds() {
        let store = Arc::new(InMemoryLedger::new());
        let (tx, rx) = transaction_channel(16);
        drop(rx);
        let reconciler = Reconciler::new(store.clone(), tx);
        store.create_order(order_fixture("CR1")).await.unwrap();

        let outcome =
            reconciler.apply(notification("CR1", "success", "razorpay")).await.unwrap();
        assert!(!outcome.duplicate);
    }

    /// Ledger whose next gateway update fails, modelling a crash between
    /// the settlement append and the gateway overwrite
    struct FlakyGatewayLedger {
        inner: InMemoryLedger,
        fail_next_gateway_update: AtomicBool,
    }

    #[async_trait::async_trait]
    impl LedgerStore for FlakyGatewayLedger {
        async fn create_order(&self, order: NewOrder) -> LedgerResult<Order> {
            self.inner.create_order(order).await
        }

        async fn order_by_id(&self, id: Uuid) -> LedgerResult<Option<Order>> {
            self.inner.order_by_id(id).await
        }

        async fn order_by_reference(&self, reference: &str) -> LedgerResult<Option<Order>> {
            self.inner.order_by_reference(reference).await
        }

        async fn orders_by_school(
            &self,
            school_id: &str,
            page: &PageRequest,
        ) -> LedgerResult<Vec<Order>> {
            self.inner.orders_by_school(school_id, page).await
        }

        async fn update_order_gateway(&self, reference: &str, gateway: &str) -> LedgerResult<()> {
            if self.fail_next_gateway_update.swap(false, Ordering::SeqCst) {
                return Err(LedgerError::Database(sqlx::Error::PoolClosed));
            }
            self.inner.update_order_gateway(reference, gateway).await
        }

        async fn append_settlement(
            &self,
            settlement: NewSettlement,
        ) -> LedgerResult<AppendOutcome> {
            self.inner.append_settlement(settlement).await
        }

        async fn settlements_by_reference(&self, reference: &str) -> LedgerResult<Vec<Settlement>> {
            self.inner.settlements_by_reference(reference).await
        }

        async fn ledger_page(
            &self,
            school_id: Option<&str>,
            page: &PageRequest,
        ) -> LedgerResult<LedgerPage> {
            self.inner.ledger_page(school_id, page).await
        }
    }

    #[tokio::test]
    async fn retry_after_failed_gateway_update_still_converges() {
        let store = Arc::new(FlakyGatewayLedger {
            inner: InMemoryLedger::new(),
            fail_next_gateway_update: AtomicBool::new(true),
        });
        let (tx, _rx) = transaction_channel(16);
        let reconciler = Reconciler::new(store.clone(), tx);
        store.create_order(order_fixture("CR1")).await.unwrap();

        // First delivery appends the settlement, then fails on the update
        let err = reconciler.apply(notification("CR1", "success", "phonepe")).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Ledger(_)));
        assert_eq!(store.settlements_by_reference("CR1").await.unwrap().len(), 1);
        assert_eq!(
            store.order_by_reference("CR1").await.unwrap().unwrap().gateway_name,
            "razorpay"
        );

        // The aggregator's retry dedupes the append but must still land
        // the gateway overwrite
        let outcome = reconciler.apply(notification("CR1", "success", "phonepe")).await.unwrap();
        assert!(outcome.duplicate);
        assert_eq!(store.settlements_by_reference("CR1").await.unwrap().len(), 1);
        assert_eq!(
            store.order_by_reference("CR1").await.unwrap().unwrap().gateway_name,
            "phonepe"
        );
    }

    #[test]
    fn notification_deserializes_from_the_wire_shape() {
        let body = serde_json::json!({
            "order_info": {
                "order_id": "CR1",
                "order_amount": 500,
                "transaction_amount": 500,
                "status": "success",
                "payment_time": "2024-01-01T00:00:00Z",
                "gateway": "razorpay"
            }
        });

        let notification: WebhookNotification = serde_json::from_value(body).unwrap();
        assert_eq!(notification.order_info.order_id, "CR1");
        assert_eq!(notification.order_info.order_amount, 500.0);
        assert!(notification.order_info.payment_mode.is_none());
    }
}
