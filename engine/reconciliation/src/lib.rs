//! Reconciliation - the webhook-driven settlement path
//!
//! A collection reference moves through three externally observable states:
//! no order, order placed, settled. This crate owns the one transition with
//! real failure modes: joining an inbound settlement notification to its
//! originating order, persisting the settlement, and publishing the
//! normalized transaction event for realtime fan-out.
//!
//! The handler publishes onto a `tokio::sync::broadcast` channel and never
//! touches the realtime transport itself; the dashboard gateway owns the
//! subscriber end. That keeps the reconciliation contract testable without
//! a live connection layer.

pub mod error;
pub mod event;
pub mod handler;

pub use error::{ReconcileError, ReconcileResult};
pub use event::{transaction_channel, TransactionEvent};
pub use handler::{OrderInfo, ReconcileOutcome, Reconciler, WebhookNotification};
