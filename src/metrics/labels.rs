//! Metric label schema.
//!
//! The label set is assembled once at startup from configuration and shared
//! by every aggregator. It never changes for the life of the process;
//! changing labels means restarting the monitor.

use std::collections::HashMap;

use crate::config::Config;

/// Ordered, immutable name/value mapping applied to every metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    pairs: Vec<(&'static str, String)>,
}

impl LabelSet {
    /// Build the label set from configuration.
    ///
    /// `hops` is always present (0 for zero-hop routing, 1 otherwise), as is
    /// `location` (defaulted upstream). The descriptive labels are included
    /// only when configured.
    pub fn from_config(config: &Config) -> Self {
        let hops = if config.zero_hop { 0 } else { 1 };

        let mut pairs: Vec<(&'static str, String)> = vec![
            ("hops", hops.to_string()),
            ("location", config.labels.location.clone()),
        ];

        let optional = [
            ("instance", &config.labels.instance),
            ("region", &config.labels.region),
            ("zone", &config.labels.zone),
            ("latitude", &config.labels.latitude),
            ("longitude", &config.labels.longitude),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                pairs.push((name, value.clone()));
            }
        }

        Self { pairs }
    }

    /// Label pairs in schema order.
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    /// Look up a single label value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The schema as const labels for metric descriptors.
    pub fn to_const_labels(&self) -> HashMap<String, String> {
        self.pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.clone()))
            .collect()
    }
}
