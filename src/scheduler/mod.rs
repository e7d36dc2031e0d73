//! Tick scheduler.
//!
//! Drives repeated measurement ticks: one startup offset, then a repeating
//! interval. Each firing spawns exactly one tick and the scheduler never
//! waits for it, so ticks overlap when the interval is shorter than the
//! measurement plus export latency. That is accepted behavior; operators
//! must choose an interval larger than the expected worst-case tick
//! duration.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info};

use crate::exporter::Exporter;
use crate::metrics::LatencyMetrics;
use crate::routing::Routing;
use crate::runner;

/// Drives the measure-observe-export loop for the life of the process.
pub struct TickScheduler {
    client: Arc<dyn Routing>,
    rpc_provider: String,
    metrics: LatencyMetrics,
    exporter: Exporter,
    offset: Duration,
    tick_interval: Duration,
}

impl TickScheduler {
    pub fn new(
        client: Arc<dyn Routing>,
        rpc_provider: String,
        metrics: LatencyMetrics,
        exporter: Exporter,
        offset: Duration,
        tick_interval: Duration,
    ) -> Self {
        Self {
            client,
            rpc_provider,
            metrics,
            exporter,
            offset,
            tick_interval,
        }
    }

    /// Run until shutdown. The first tick fires after the startup offset,
    /// each following tick one interval later.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            offset = %humantime::format_duration(self.offset),
            interval = %humantime::format_duration(self.tick_interval),
            "tick scheduler starting"
        );

        tokio::select! {
            () = sleep(self.offset) => {}
            _ = shutdown.recv() => {
                info!("tick scheduler shutting down before first tick");
                return;
            }
        }

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Fire and forget; a slow tick must not delay the next
                    // firing.
                    let client = Arc::clone(&self.client);
                    let rpc_provider = self.rpc_provider.clone();
                    let metrics = self.metrics.clone();
                    let exporter = self.exporter.clone();
                    tokio::spawn(async move {
                        run_tick(client, &rpc_provider, metrics, exporter).await;
                    });
                }

                _ = shutdown.recv() => {
                    info!("tick scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// One tick: measure, record the outcome, export. The export step always
/// runs, whatever the measurement did.
async fn run_tick(
    client: Arc<dyn Routing>,
    rpc_provider: &str,
    metrics: LatencyMetrics,
    exporter: Exporter,
) {
    match runner::measure_once(client.as_ref(), rpc_provider).await {
        Ok(durations) => {
            info!(
                fetch_ms = durations.fetch_dur,
                rpc_ms = durations.rpc_dur,
                exit_app_ms = durations.exit_app_dur,
                seg_ms = durations.seg_dur,
                hopr_ms = durations.hopr_dur,
                "latency probe complete"
            );
            metrics.observe(&durations);
        }
        Err(e) => {
            error!(error = %e, "error trying to check latency");
            metrics.record_error();
        }
    }

    exporter.push(metrics.gather()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DescriptiveLabels, LogFormat, PushMode};
    use crate::metrics::LabelSet;
    use crate::routing::{
        LatencyHandler, RequestSpec, RoutingError, RoutingResponse,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoClient {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl Routing for EchoClient {
        async fn is_ready(&self, _timeout: Duration) -> Result<(), RoutingError> {
            Ok(())
        }

        async fn fetch(
            &self,
            _url: &str,
            spec: RequestSpec,
        ) -> Result<RoutingResponse, RoutingError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let sent: serde_json::Value = serde_json::from_str(&spec.body).unwrap();
            let body = serde_json::json!({ "jsonrpc": "2.0", "id": sent["id"], "result": "0x1" });
            Ok(RoutingResponse::new(200, body.to_string().into_bytes()))
        }

        fn set_latency_handler(&self, _handler: LatencyHandler) {}
    }

    struct NeverReadyClient;

    #[async_trait]
    impl Routing for NeverReadyClient {
        async fn is_ready(&self, timeout: Duration) -> Result<(), RoutingError> {
            Err(RoutingError::ReadyTimeout(timeout))
        }

        async fn fetch(
            &self,
            _url: &str,
            _spec: RequestSpec,
        ) -> Result<RoutingResponse, RoutingError> {
            Err(RoutingError::Transport("unreachable".to_string()))
        }

        fn set_latency_handler(&self, _handler: LatencyHandler) {}
    }

    fn test_metrics() -> LatencyMetrics {
        let config = Config {
            client_id: "probe".to_string(),
            rpc_provider: "https://rpc.example.com".to_string(),
            zero_hop: false,
            discovery_platform: None,
            push_gateway: None,
            push_mode: PushMode::Replace,
            interval: Duration::from_secs(60),
            offset: Duration::ZERO,
            labels: DescriptiveLabels {
                location: "unset".to_string(),
                ..DescriptiveLabels::default()
            },
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        };
        LatencyMetrics::new(&LabelSet::from_config(&config)).unwrap()
    }

    #[tokio::test]
    async fn tick_records_success_and_exports() {
        let client = Arc::new(EchoClient {
            fetches: AtomicU32::new(0),
        });
        let metrics = test_metrics();

        run_tick(
            Arc::clone(&client) as Arc<dyn Routing>,
            "http://rpc.example.com",
            metrics.clone(),
            Exporter::disabled(),
        )
        .await;

        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.fetch_sum().count(), 1);
        assert_eq!(metrics.error_count(), 0);
    }

    #[tokio::test]
    async fn tick_records_error_without_touching_summaries() {
        let metrics = test_metrics();

        run_tick(
            Arc::new(NeverReadyClient),
            "http://rpc.example.com",
            metrics.clone(),
            Exporter::disabled(),
        )
        .await;

        assert_eq!(metrics.error_count(), 1);
        assert_eq!(metrics.fetch_sum().count(), 0);
    }

    #[tokio::test]
    async fn scheduler_ticks_on_schedule_and_stops_on_shutdown() {
        let client = Arc::new(EchoClient {
            fetches: AtomicU32::new(0),
        });
        let metrics = test_metrics();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let scheduler = TickScheduler::new(
            Arc::clone(&client) as Arc<dyn Routing>,
            "http://rpc.example.com".to_string(),
            metrics.clone(),
            Exporter::disabled(),
            Duration::from_millis(10),
            Duration::from_millis(25),
        );
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(120)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let observed = metrics.fetch_sum().count();
        assert!(observed >= 2, "expected at least 2 ticks, saw {}", observed);
        assert_eq!(metrics.error_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_during_offset_prevents_any_tick() {
        let client = Arc::new(EchoClient {
            fetches: AtomicU32::new(0),
        });
        let metrics = test_metrics();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let scheduler = TickScheduler::new(
            Arc::clone(&client) as Arc<dyn Routing>,
            "http://rpc.example.com".to_string(),
            metrics.clone(),
            Exporter::disabled(),
            Duration::from_secs(60),
            Duration::from_millis(10),
        );
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
    }
}
