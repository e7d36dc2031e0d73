//! Quantile summary aggregator.
//!
//! The prometheus crate ships no summary metric, so this one is built from
//! an HdrHistogram and exposed through a custom [`Collector`]: observations
//! land in the histogram, and each gather renders a Prometheus summary
//! family with the configured quantiles. Observation is mutex-guarded and
//! the sum is atomic, so concurrent ticks can observe while an export is
//! encoding.

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::metrics::LabelSet;

/// Quantile thresholds exposed by every duration summary.
pub const QUANTILES: [f64; 4] = [0.5, 0.7, 0.9, 0.99];

// HdrHistogram range: 1 ms discernible, 1 h ceiling, 3 significant figures.
// Values above the ceiling are clamped, not dropped.
const HIST_LOW: u64 = 1;
const HIST_HIGH: u64 = 3_600_000;
const HIST_SIGFIG: u8 = 3;

/// A labeled summary of millisecond durations.
#[derive(Clone)]
pub struct LatencySummary {
    inner: Arc<SummaryInner>,
}

struct SummaryInner {
    desc: Desc,
    label_pairs: Vec<proto::LabelPair>,
    hist: Mutex<Histogram<u64>>,
    sum_ms: AtomicU64,
}

impl LatencySummary {
    /// Create a summary with the given exposition name and the shared label
    /// schema. The schema is baked in here and cannot change afterwards.
    pub fn new(name: &str, help: &str, labels: &LabelSet) -> Result<Self, prometheus::Error> {
        let desc = Desc::new(
            name.to_string(),
            help.to_string(),
            Vec::new(),
            labels.to_const_labels(),
        )?;

        let hist = Histogram::new_with_bounds(HIST_LOW, HIST_HIGH, HIST_SIGFIG)
            .map_err(|e| prometheus::Error::Msg(e.to_string()))?;

        let label_pairs = labels
            .pairs()
            .iter()
            .map(|(name, value)| {
                let mut pair = proto::LabelPair::default();
                pair.set_name(name.to_string());
                pair.set_value(value.clone());
                pair
            })
            .collect();

        Ok(Self {
            inner: Arc::new(SummaryInner {
                desc,
                label_pairs,
                hist: Mutex::new(hist),
                sum_ms: AtomicU64::new(0),
            }),
        })
    }

    /// Record one duration in milliseconds.
    pub fn observe(&self, value_ms: u64) {
        self.inner.hist.lock().saturating_record(value_ms);
        self.inner.sum_ms.fetch_add(value_ms, Ordering::Relaxed);
    }

    /// Number of recorded observations.
    pub fn count(&self) -> u64 {
        self.inner.hist.lock().len()
    }

    /// Sum of recorded observations in milliseconds.
    pub fn sum(&self) -> u64 {
        self.inner.sum_ms.load(Ordering::Relaxed)
    }

    /// Estimated value at `quantile` (0.0..=1.0).
    pub fn quantile(&self, quantile: f64) -> u64 {
        self.inner.hist.lock().value_at_quantile(quantile)
    }
}

impl Collector for LatencySummary {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.inner.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let (count, quantile_values) = {
            let hist = self.inner.hist.lock();
            let values: Vec<(f64, u64)> = QUANTILES
                .iter()
                .map(|&q| (q, hist.value_at_quantile(q)))
                .collect();
            (hist.len(), values)
        };

        let mut summary = proto::Summary::default();
        summary.set_sample_count(count);
        summary.set_sample_sum(self.inner.sum_ms.load(Ordering::Relaxed) as f64);
        let mut quantiles = Vec::new();
        for (quantile, value) in quantile_values {
            let mut pair = proto::Quantile::default();
            pair.set_quantile(quantile);
            pair.set_value(value as f64);
            quantiles.push(pair);
        }
        summary.set_quantile(quantiles);

        let mut metric = proto::Metric::default();
        metric.set_label(self.inner.label_pairs.clone());
        metric.set_summary(summary);

        let mut family = proto::MetricFamily::default();
        family.set_name(self.inner.desc.fq_name.clone());
        family.set_help(self.inner.desc.help.clone());
        family.set_field_type(proto::MetricType::SUMMARY);
        family.mut_metric().push(metric);

        vec![family]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DescriptiveLabels, LogFormat, PushMode};
    use std::time::Duration;

    fn labels() -> LabelSet {
        let config = Config {
            client_id: "probe".to_string(),
            rpc_provider: "https://rpc.example.com".to_string(),
            zero_hop: true,
            discovery_platform: None,
            push_gateway: None,
            push_mode: PushMode::Replace,
            interval: Duration::from_secs(60),
            offset: Duration::ZERO,
            labels: DescriptiveLabels {
                location: "berlin".to_string(),
                ..DescriptiveLabels::default()
            },
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        };
        LabelSet::from_config(&config)
    }

    fn summary() -> LatencySummary {
        LatencySummary::new("test_latency_milliseconds", "Test latency", &labels()).unwrap()
    }

    #[test]
    fn observe_updates_count_and_sum() {
        let summary = summary();
        summary.observe(120);
        summary.observe(80);

        assert_eq!(summary.count(), 2);
        assert_eq!(summary.sum(), 200);
    }

    #[test]
    fn repeated_observations_grow_the_count_monotonically() {
        let summary = summary();
        summary.observe(120);
        let first = summary.count();
        summary.observe(120);

        assert_eq!(summary.count(), first + 1);
    }

    #[test]
    fn quantiles_reflect_observations() {
        let summary = summary();
        for value in 1..=100 {
            summary.observe(value);
        }

        let p50 = summary.quantile(0.5);
        let p99 = summary.quantile(0.99);
        assert!((45..=55).contains(&p50), "p50 was {}", p50);
        assert!(p99 >= 95, "p99 was {}", p99);
    }

    #[test]
    fn zero_values_are_recordable() {
        let summary = summary();
        summary.observe(0);
        assert_eq!(summary.count(), 1);
        assert_eq!(summary.sum(), 0);
    }

    #[test]
    fn collect_renders_a_summary_family() {
        let summary = summary();
        summary.observe(120);

        let families = summary.collect();
        assert_eq!(families.len(), 1);

        let family = &families[0];
        assert_eq!(family.get_name(), "test_latency_milliseconds");
        assert_eq!(family.get_field_type(), proto::MetricType::SUMMARY);

        let metric = &family.get_metric()[0];
        let rendered = metric.get_summary();
        assert_eq!(rendered.get_sample_count(), 1);
        assert_eq!(rendered.get_sample_sum(), 120.0);
        assert_eq!(rendered.get_quantile().len(), QUANTILES.len());

        let label_names: Vec<&str> = metric.get_label().iter().map(|l| l.get_name()).collect();
        assert_eq!(label_names, vec!["hops", "location"]);
    }

    #[test]
    fn concurrent_observations_are_not_lost() {
        let summary = summary();
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let summary = summary.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        summary.observe(10);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(summary.count(), 800);
        assert_eq!(summary.sum(), 8000);
    }
}
