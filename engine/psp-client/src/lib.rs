//! PspClient - signed outbound calls to the payment aggregator
//!
//! This crate owns the two outbound flows of the collection platform:
//! creating a collect request and querying its status. Both flows sign
//! their payload with the aggregator's shared key before the call.

pub mod client;
pub mod config;
pub mod error;
pub mod signer;

pub use client::{AggregatorClient, CollectRequest};
pub use config::PspConfig;
pub use error::{PspError, PspResult};
pub use signer::Signer;
