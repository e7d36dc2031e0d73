//! The fixed metric set of the monitor.
//!
//! Five duration summaries and one error counter, created once at startup
//! against a finalized label schema and mutated once per tick.

use prometheus::proto::MetricFamily;
use prometheus::{IntCounter, Opts, Registry};
use std::sync::Arc;

use crate::metrics::{LabelSet, LatencySummary};
use crate::runner::Durations;

/// Aggregated latency measurements, shared across ticks.
#[derive(Clone)]
pub struct LatencyMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    /// Total latency of the full outbound call.
    fetch_sum: LatencySummary,
    /// Round-trip RPC call duration.
    rpc_sum: LatencySummary,
    /// Exit application time, excluding the RPC call.
    exit_app_sum: LatencySummary,
    /// Segment sending, including acknowledgment receipt.
    seg_sum: LatencySummary,
    /// Estimated mixnet traversal.
    hopr_sum: LatencySummary,
    /// Failed measurement attempts.
    error_count: IntCounter,
    /// The prometheus registry backing `gather`.
    registry: Registry,
}

impl LatencyMetrics {
    /// Build every aggregator against the shared label schema.
    pub fn new(labels: &LabelSet) -> Result<Self, prometheus::Error> {
        let fetch_sum = LatencySummary::new(
            "uhttp_latency_milliseconds",
            "Total latency of successful request",
            labels,
        )?;
        let rpc_sum = LatencySummary::new(
            "uhttp_rpc_call_milliseconds",
            "The total duration of a round-trip RPC call",
            labels,
        )?;
        let exit_app_sum = LatencySummary::new(
            "uhttp_exit_app_milliseconds",
            "Approximate total execution time spent in the exit application, excluding RPC call duration",
            labels,
        )?;
        let seg_sum = LatencySummary::new(
            "uhttp_segment_sending_milliseconds",
            "Total duration of sending all segments to the entry node, including acknowledgment receipt",
            labels,
        )?;
        let hopr_sum = LatencySummary::new(
            "uhttp_hopr_network_milliseconds",
            "Estimated duration through the mixnet back and forth",
            labels,
        )?;
        let error_count = IntCounter::with_opts(
            Opts::new("uhttp_error", "Latency measure not possible due to error")
                .const_labels(labels.to_const_labels()),
        )?;

        let registry = Registry::new();
        registry.register(Box::new(fetch_sum.clone()))?;
        registry.register(Box::new(rpc_sum.clone()))?;
        registry.register(Box::new(exit_app_sum.clone()))?;
        registry.register(Box::new(seg_sum.clone()))?;
        registry.register(Box::new(hopr_sum.clone()))?;
        registry.register(Box::new(error_count.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                fetch_sum,
                rpc_sum,
                exit_app_sum,
                seg_sum,
                hopr_sum,
                error_count,
                registry,
            }),
        })
    }

    /// Record one successful measurement.
    pub fn observe(&self, durations: &Durations) {
        self.inner.fetch_sum.observe(durations.fetch_dur);
        self.inner.rpc_sum.observe(durations.rpc_dur);
        self.inner.exit_app_sum.observe(durations.exit_app_dur);
        self.inner.seg_sum.observe(durations.seg_dur);
        self.inner.hopr_sum.observe(durations.hopr_dur);
    }

    /// Record one failed measurement attempt.
    pub fn record_error(&self) {
        self.inner.error_count.inc();
    }

    /// Point-in-time snapshot of every aggregator, for the exporter.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.inner.registry.gather()
    }

    /// Current error count.
    pub fn error_count(&self) -> u64 {
        self.inner.error_count.get()
    }

    /// The total-latency summary. Exposed for assertions on aggregate state.
    pub fn fetch_sum(&self) -> &LatencySummary {
        &self.inner.fetch_sum
    }

    /// The RPC-call summary.
    pub fn rpc_sum(&self) -> &LatencySummary {
        &self.inner.rpc_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DescriptiveLabels, LogFormat, PushMode};
    use prometheus::proto::MetricType;
    use std::time::Duration;

    fn metrics() -> LatencyMetrics {
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

    fn sample_durations() -> Durations {
        Durations {
            fetch_dur: 120,
            rpc_dur: 80,
            exit_app_dur: 20,
            seg_dur: 15,
            hopr_dur: 5,
        }
    }

    #[test]
    fn observe_populates_every_summary() {
        let metrics = metrics();
        metrics.observe(&sample_durations());

        assert_eq!(metrics.fetch_sum().count(), 1);
        assert_eq!(metrics.fetch_sum().sum(), 120);
        assert_eq!(metrics.rpc_sum().count(), 1);
        assert_eq!(metrics.error_count(), 0);
    }

    #[test]
    fn record_error_leaves_summaries_untouched() {
        let metrics = metrics();
        metrics.record_error();

        assert_eq!(metrics.error_count(), 1);
        assert_eq!(metrics.fetch_sum().count(), 0);
    }

    #[test]
    fn two_observations_double_the_sample_count() {
        let metrics = metrics();
        metrics.observe(&sample_durations());
        metrics.observe(&sample_durations());

        assert_eq!(metrics.fetch_sum().count(), 2);
        assert_eq!(metrics.fetch_sum().sum(), 240);
    }

    #[test]
    fn gather_returns_all_families() {
        let metrics = metrics();
        metrics.observe(&sample_durations());
        metrics.record_error();

        let families = metrics.gather();
        let mut names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "uhttp_error",
                "uhttp_exit_app_milliseconds",
                "uhttp_hopr_network_milliseconds",
                "uhttp_latency_milliseconds",
                "uhttp_rpc_call_milliseconds",
                "uhttp_segment_sending_milliseconds",
            ]
        );

        let error_family = families
            .iter()
            .find(|f| f.get_name() == "uhttp_error")
            .unwrap();
        assert_eq!(error_family.get_field_type(), MetricType::COUNTER);
        assert_eq!(error_family.get_metric()[0].get_counter().get_value(), 1.0);
    }

    #[test]
    fn every_family_carries_the_same_label_schema() {
        let metrics = metrics();
        metrics.observe(&sample_durations());

        for family in metrics.gather() {
            let mut names: Vec<&str> = family.get_metric()[0]
                .get_label()
                .iter()
                .map(|l| l.get_name())
                .collect();
            names.sort_unstable();
            assert_eq!(names, vec!["hops", "location"], "family {}", family.get_name());
        }
    }
}
