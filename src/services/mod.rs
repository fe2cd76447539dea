//! Transform and publish services

pub mod normalizer;
pub mod publisher;

pub use normalizer::{normalize, round_half_even, Payload};
pub use publisher::{AirMonitorPublisher, PublishOutcome, PublishReport};

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Numeric readings for one group and one cycle, keyed by AirMonitor field name.
///
/// A missing key means the entity had no valid reading this cycle.
pub type ReadingSet = BTreeMap<String, f64>;

/// Destination for publish-ready payloads
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReadingSink: Send + Sync {
    async fn publish(&self, payload: &Payload) -> PublishReport;
}
