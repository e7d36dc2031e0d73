//! Routing capability boundary.
//!
//! The latency monitor measures requests through an external routing client
//! (in production a mixnet-capable uHTTP client). This module defines the
//! capability surface the rest of the crate consumes: readiness, a fetch
//! call, and an asynchronous latency-statistics side channel. The mixnet
//! transport itself lives behind this trait; [`DirectClient`] is the
//! plain-HTTP implementation shipped with this crate.

mod direct;
mod register;

pub use direct::{DirectClient, Settings};
pub use register::LatencyRegister;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Handler invoked by a routing client whenever it has latency statistics
/// to report. Payloads arrive as raw JSON and may be invalid; validation
/// is the receiver's job (see [`LatencyRegister`]).
pub type LatencyHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Errors surfaced by a routing client.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing client not ready within {0:?}")]
    ReadyTimeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Per-request latency breakdown reported by a routing client.
///
/// Field names follow the wire payload (`rpcDur`, `exitAppDur`, ...). All
/// values are milliseconds; the unsigned types reject negative payloads at
/// deserialization time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyStatistics {
    /// Round-trip duration of the RPC call itself.
    pub rpc_dur: u64,
    /// Time spent in the exit application, excluding the RPC call.
    pub exit_app_dur: u64,
    /// Time to send all transport segments, including acknowledgment.
    pub seg_dur: u64,
    /// Estimated time through the mixnet, back and forth.
    pub hopr_dur: u64,
}

/// Outbound request passed to [`Routing::fetch`].
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl RequestSpec {
    /// A POST with a JSON body and matching `Content-Type` header.
    pub fn json_post(body: String) -> Self {
        Self {
            method: "POST",
            headers: vec![("Content-Type", "application/json".to_string())],
            body,
        }
    }
}

/// Response returned by [`Routing::fetch`].
#[derive(Debug, Clone)]
pub struct RoutingResponse {
    status: u16,
    body: Vec<u8>,
}

impl RoutingResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Whether the response carries a success (2xx) status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Decode the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Capability surface of a routing client.
///
/// `set_latency_handler` must be called before `fetch` if the caller wants
/// the statistics for that request; the client may report them at any point
/// once the request is in flight.
#[async_trait]
pub trait Routing: Send + Sync {
    /// Wait until the client can serve requests, bounded by `timeout`.
    async fn is_ready(&self, timeout: Duration) -> Result<(), RoutingError>;

    /// Issue a request through the routing transport.
    async fn fetch(&self, url: &str, spec: RequestSpec) -> Result<RoutingResponse, RoutingError>;

    /// Install the latency-statistics handler. Replaces any previous handler.
    fn set_latency_handler(&self, handler: LatencyHandler);
}
