//! Order records - the intent to collect a payment

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Student the collection is raised for; embedded in the order rather than
/// a separate entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentInfo {
    pub name: String,
    pub student_id: String,
    pub email: String,
}

/// An order as handed to the store, before an internal id is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Aggregator-assigned collection reference; set exactly once, at
    /// creation, and never changed afterwards
    pub collect_reference: String,

    pub school_id: String,

    pub trustee_id: String,

    /// Gateway the operator requested. Reconciliation may overwrite this
    /// with the gateway that actually settled the payment.
    pub gateway_name: String,

    pub student: StudentInfo,
}

/// A persisted order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Internal identifier, immutable and globally unique; exposed to
    /// clients as the "custom order id"
    pub id: Uuid,

    pub collect_reference: String,

    pub school_id: String,

    pub trustee_id: String,

    pub gateway_name: String,

    pub student: StudentInfo,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Materialize a new order from its creation request
    pub fn from_new(new: NewOrder) -> Self {
        Self {
            id: Uuid::new_v4(),
            collect_reference: new.collect_reference,
            school_id: new.school_id,
            trustee_id: new.trustee_id,
            gateway_name: new.gateway_name,
            student: new.student,
            created_at: Utc::now(),
        }
    }
}
