//! Pagination and the joined transaction projection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default page when the client omits or mangles the parameter
pub const DEFAULT_PAGE: u64 = 1;

/// Default page size
pub const DEFAULT_LIMIT: u64 = 10;

/// Validated pagination request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, limit: DEFAULT_LIMIT }
    }
}

impl PageRequest {
    /// Build a request from raw query parameters. Missing, non-numeric or
    /// zero values fall back to the defaults rather than erroring.
    pub fn from_params(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|&p| p >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .and_then(|l| l.trim().parse::<u64>().ok())
            .filter(|&l| l >= 1)
            .unwrap_or(DEFAULT_LIMIT);
        Self { page, limit }
    }

    /// Number of records to skip
    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// Page metadata returned alongside every listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub next_page: Option<u64>,
    pub previous_page: Option<u64>,
}

impl PageInfo {
    /// Compute page metadata for a listing of `total` records
    pub fn new(total: u64, request: &PageRequest) -> Self {
        let limit = request.limit.max(1);
        let total_pages = total.div_ceil(limit);
        let page = request.page;
        let has_next_page = page < total_pages;
        let has_previous_page = page > 1 && total > 0;
        Self {
            total,
            page,
            limit,
            total_pages,
            has_next_page,
            has_previous_page,
            next_page: has_next_page.then_some(page + 1),
            previous_page: has_previous_page.then_some(page - 1),
        }
    }
}

/// One row of the Order-Settlement join, as shown on the dashboard ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRow {
    pub collect_reference: String,
    pub school_id: String,
    pub gateway: String,
    pub order_amount: f64,
    pub transaction_amount: f64,
    pub status: String,
    pub payment_time: DateTime<Utc>,
    /// The order's internal id, exposed as the human-facing order handle
    pub custom_order_id: Uuid,
}

/// One page of the transaction ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerPage {
    pub transactions: Vec<TransactionRow>,
    pub pagination: PageInfo,
}
