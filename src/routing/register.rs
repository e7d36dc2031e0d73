//! Last-valid-value-wins register for latency statistics.
//!
//! Routing clients report statistics through an asynchronous callback that
//! may fire zero or more times per request, possibly with payloads that do
//! not validate. The register is installed before the request is issued so
//! no report can slip past it, and the runner reads it synchronously after
//! the response arrives.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::routing::{LatencyHandler, LatencyStatistics};

/// Stores the most recent statistics payload that validated.
///
/// Invalid payloads are ignored, not propagated as errors.
#[derive(Clone, Default)]
pub struct LatencyRegister {
    slot: Arc<Mutex<Option<LatencyStatistics>>>,
}

impl LatencyRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler to install on a routing client via
    /// [`Routing::set_latency_handler`](crate::routing::Routing::set_latency_handler).
    pub fn handler(&self) -> LatencyHandler {
        let slot = Arc::clone(&self.slot);
        Arc::new(move |payload| {
            match serde_json::from_value::<LatencyStatistics>(payload) {
                Ok(stats) => *slot.lock() = Some(stats),
                Err(_) => {} // invalid payload, keep the last valid value
            }
        })
    }

    /// Take the captured statistics, leaving the register empty.
    pub fn take(&self) -> Option<LatencyStatistics> {
        self.slot.lock().take()
    }
}
