//! Measurement runner.
//!
//! Executes exactly one probe request against a routing client and produces
//! a duration breakdown or a typed failure. Retry policy belongs to the
//! scheduler, and in this design there is none: one probe per tick.

use rand::Rng;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::routing::{LatencyRegister, LatencyStatistics, RequestSpec, Routing, RoutingError};

/// Bound on waiting for the routing client to become ready.
pub const READY_TIMEOUT: Duration = Duration::from_millis(10_000);

/// A single successful measurement, decomposed into network-layer phases.
///
/// All values are milliseconds. `fetch_dur` is measured by the runner from a
/// monotonic clock and is not the sum of the other four fields; it includes
/// client-side overhead the phase statistics do not capture. The phase
/// fields are zero when the routing client never reported statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Durations {
    /// Wall-clock time of the full outbound call, start to response.
    pub fetch_dur: u64,
    /// Round-trip duration of the RPC call.
    pub rpc_dur: u64,
    /// Time spent in the exit application, excluding the RPC call.
    pub exit_app_dur: u64,
    /// Time to send all transport segments, including acknowledgment.
    pub seg_dur: u64,
    /// Estimated time through the mixnet.
    pub hopr_dur: u64,
}

impl Durations {
    /// Combine the runner's own timing with whatever statistics the routing
    /// client reported.
    pub fn from_parts(fetch_dur: u64, stats: Option<LatencyStatistics>) -> Self {
        let stats = stats.unwrap_or_default();
        Self {
            fetch_dur,
            rpc_dur: stats.rpc_dur,
            exit_app_dur: stats.exit_app_dur,
            seg_dur: stats.seg_dur,
            hopr_dur: stats.hopr_dur,
        }
    }
}

/// Ways a single measurement can fail.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("routing client did not become ready: {0}")]
    Readiness(#[source] RoutingError),

    #[error("probe request failed: {0}")]
    Fetch(#[source] RoutingError),

    #[error("probe response status {status}")]
    FetchStatus { status: u16 },

    #[error("probe response could not be decoded: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("probe response id {received:?} does not match request id {sent:?}")]
    RequestMismatch {
        sent: String,
        received: Option<String>,
    },
}

#[derive(serde::Deserialize)]
struct JsonRpcReply {
    #[serde(default)]
    id: Option<String>,
}

/// Run one latency probe through `client` against `rpc_provider`.
///
/// Sequence: wait for readiness (bounded), install the statistics register,
/// POST a fixed JSON-RPC request, time the response, verify the echoed id.
/// The register is installed before the request goes out so statistics
/// reported mid-flight cannot be missed.
pub async fn measure_once(
    client: &dyn Routing,
    rpc_provider: &str,
) -> Result<Durations, MeasureError> {
    // Small random id, only needs to be distinguishable within one tick.
    let id = rand::thread_rng().gen_range(0..100).to_string();
    let payload = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "eth_getBlockTransactionCountByNumber",
        "params": ["latest"],
        "id": id,
    });

    client
        .is_ready(READY_TIMEOUT)
        .await
        .map_err(MeasureError::Readiness)?;

    let register = LatencyRegister::new();
    client.set_latency_handler(register.handler());

    let started = Instant::now();
    let response = client
        .fetch(rpc_provider, RequestSpec::json_post(payload.to_string()))
        .await
        .map_err(MeasureError::Fetch)?;
    let fetch_dur = round_ms(started.elapsed());

    if !response.ok() {
        return Err(MeasureError::FetchStatus {
            status: response.status(),
        });
    }

    let reply: JsonRpcReply = response.json().map_err(MeasureError::MalformedResponse)?;
    match reply.id {
        Some(received) if received == id => {
            let stats = register.take();
            if stats.is_none() {
                debug!("routing client reported no latency statistics");
            }
            Ok(Durations::from_parts(fetch_dur, stats))
        }
        received => Err(MeasureError::RequestMismatch { sent: id, received }),
    }
}

/// Elapsed wall-clock time, rounded to the nearest millisecond.
fn round_ms(elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1000.0).round() as u64
}
