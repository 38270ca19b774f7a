//! Postgres-backed ledger implementation
//!
//! Uses runtime-checked queries against the schema in `schema.sql`. The
//! settlement dedupe key carries a unique index, so insert-if-absent is a
//! single `ON CONFLICT DO NOTHING` statement rather than a read-then-write
//! sequence.

use crate::error::LedgerResult;
use crate::order::{NewOrder, Order, StudentInfo};
use crate::query::{LedgerPage, PageInfo, PageRequest, TransactionRow};
use crate::settlement::{AppendOutcome, NewSettlement, Settlement};
use crate::store::LedgerStore;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Ledger stores backed by a Postgres pool
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Create a ledger over an existing connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
        Ok(Order {
            id: row.try_get("id")?,
            collect_reference: row.try_get("collect_reference")?,
            school_id: row.try_get("school_id")?,
            trustee_id: row.try_get("trustee_id")?,
            gateway_name: row.try_get("gateway_name")?,
            student: StudentInfo {
                name: row.try_get("student_name")?,
                student_id: row.try_get("student_id")?,
                email: row.try_get("student_email")?,
            },
            created_at: row.try_get("created_at")?,
        })
    }

    fn settlement_from_row(row: &PgRow) -> Result<Settlement, sqlx::Error> {
        Ok(Settlement {
            collect_reference: row.try_get("collect_reference")?,
            order_amount: row.try_get("order_amount")?,
            transaction_amount: row.try_get("transaction_amount")?,
            payment_mode: row.try_get("payment_mode")?,
            payment_details: row.try_get("payment_details")?,
            bank_reference: row.try_get("bank_reference")?,
            payment_message: row.try_get("payment_message")?,
            status: row.try_get("status")?,
            error_message: row.try_get("error_message")?,
            payment_time: row.try_get("payment_time")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn transaction_from_row(row: &PgRow) -> Result<TransactionRow, sqlx::Error> {
        Ok(TransactionRow {
            collect_reference: row.try_get("collect_reference")?,
            school_id: row.try_get("school_id")?,
            gateway: row.try_get("gateway_name")?,
            order_amount: row.try_get("order_amount")?,
            transaction_amount: row.try_get("transaction_amount")?,
            status: row.try_get("status")?,
            payment_time: row.try_get("payment_time")?,
            custom_order_id: row.try_get("custom_order_id")?,
        })
    }
}

#[async_trait::async_trait]
impl LedgerStore for PostgresLedger {
    async fn create_order(&self, order: NewOrder) -> LedgerResult<Order> {
        let order = Order::from_new(order);
        sqlx::query(
            "INSERT INTO orders \
             (id, collect_reference, school_id, trustee_id, gateway_name, \
              student_name, student_id, student_email, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order.id)
        .bind(&order.collect_reference)
        .bind(&order.school_id)
        .bind(&order.trustee_id)
        .bind(&order.gateway_name)
        .bind(&order.student.name)
        .bind(&order.student.student_id)
        .bind(&order.student.email)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(order)
    }

    async fn order_by_id(&self, id: Uuid) -> LedgerResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::order_from_row).transpose()?)
    }

    async fn order_by_reference(&self, reference: &str) -> LedgerResult<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE collect_reference = $1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Self::order_from_row).transpose()?)
    }

    async fn orders_by_school(
        &self,
        school_id: &str,
        page: &PageRequest,
    ) -> LedgerResult<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE school_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(school_id)
        .bind(page.limit as i64)
        .bind(page.skip() as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::order_from_row).collect::<Result<_, _>>()?)
    }

    async fn update_order_gateway(&self, reference: &str, gateway: &str) -> LedgerResult<()> {
        sqlx::query("UPDATE orders SET gateway_name = $1 WHERE collect_reference = $2")
            .bind(gateway)
            .bind(reference)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_settlement(&self, settlement: NewSettlement) -> LedgerResult<AppendOutcome> {
        let row = sqlx::query(
            "INSERT INTO settlements \
             (collect_reference, dedupe_key, order_amount, transaction_amount, \
              payment_mode, payment_details, bank_reference, payment_message, \
              status, error_message, payment_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (dedupe_key) DO NOTHING \
             RETURNING created_at",
        )
        .bind(&settlement.collect_reference)
        .bind(settlement.dedupe_key())
        .bind(settlement.order_amount)
        .bind(settlement.transaction_amount)
        .bind(&settlement.payment_mode)
        .bind(&settlement.payment_details)
        .bind(&settlement.bank_reference)
        .bind(&settlement.payment_message)
        .bind(&settlement.status)
        .bind(&settlement.error_message)
        .bind(settlement.payment_time)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let created_at: DateTime<Utc> = row.try_get("created_at")?;
                let mut stored = Settlement::from_new(settlement);
                stored.created_at = created_at;
                Ok(AppendOutcome::Inserted(stored))
            }
            None => Ok(AppendOutcome::Duplicate),
        }
    }

    async fn settlements_by_reference(&self, reference: &str) -> LedgerResult<Vec<Settlement>> {
        let rows = sqlx::query(
            "SELECT * FROM settlements WHERE collect_reference = $1 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Self::settlement_from_row).collect::<Result<_, _>>()?)
    }

    async fn ledger_page(
        &self,
        school_id: Option<&str>,
        page: &PageRequest,
    ) -> LedgerResult<LedgerPage> {
        let (count_sql, page_sql) = match school_id {
            Some(_) => (
                "SELECT COUNT(*) AS total FROM settlements s \
                 JOIN orders o ON o.collect_reference = s.collect_reference \
                 WHERE o.school_id = $1",
                "SELECT s.collect_reference, o.school_id, o.gateway_name, \
                        s.order_amount, s.transaction_amount, s.status, \
                        s.payment_time, o.id AS custom_order_id \
                 FROM settlements s \
                 JOIN orders o ON o.collect_reference = s.collect_reference \
                 WHERE o.school_id = $1 \
                 ORDER BY s.payment_time DESC LIMIT $2 OFFSET $3",
            ),
            None => (
                "SELECT COUNT(*) AS total FROM settlements s \
                 JOIN orders o ON o.collect_reference = s.collect_reference",
                "SELECT s.collect_reference, o.school_id, o.gateway_name, \
                        s.order_amount, s.transaction_amount, s.status, \
                        s.payment_time, o.id AS custom_order_id \
                 FROM settlements s \
                 JOIN orders o ON o.collect_reference = s.collect_reference \
                 ORDER BY s.payment_time DESC LIMIT $1 OFFSET $2",
            ),
        };

        let (total, rows) = match school_id {
            Some(school) => {
                let total: i64 = sqlx::query(count_sql)
                    .bind(school)
                    .fetch_one(&self.pool)
                    .await?
                    .try_get("total")?;
                let rows = sqlx::query(page_sql)
                    .bind(school)
                    .bind(page.limit as i64)
                    .bind(page.skip() as i64)
                    .fetch_all(&self.pool)
                    .await?;
                (total, rows)
            }
            None => {
                let total: i64 = sqlx::query(count_sql)
                    .fetch_one(&self.pool)
                    .await?
                    .try_get("total")?;
                let rows = sqlx::query(page_sql)
                    .bind(page.limit as i64)
                    .bind(page.skip() as i64)
                    .fetch_all(&self.pool)
                    .await?;
                (total, rows)
            }
        };

        let transactions =
            rows.iter().map(Self::transaction_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(LedgerPage {
            transactions,
            pagination: PageInfo::new(total.max(0) as u64, page),
        })
    }
}
