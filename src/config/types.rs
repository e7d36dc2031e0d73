//! Configuration data types.

use clap::ValueEnum;
use std::time::Duration;

/// Resolved runtime configuration.
///
/// Assembled once at startup from flags and `UHTTP_LM_*` environment
/// variables; immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Client identifier handed to the routing client.
    pub client_id: String,

    /// JSON-RPC provider URL probed every tick.
    pub rpc_provider: String,

    /// Route probes with zero hops instead of one.
    pub zero_hop: bool,

    /// Discovery platform endpoint for the routing client.
    pub discovery_platform: Option<String>,

    /// Push gateway base URL. Absent disables metrics export.
    pub push_gateway: Option<String>,

    /// Push semantics toward the gateway.
    pub push_mode: PushMode,

    /// Time between measurement ticks.
    pub interval: Duration,

    /// One-time delay before the first tick, to stagger concurrently
    /// deployed instances.
    pub offset: Duration,

    /// Descriptive metric labels.
    pub labels: DescriptiveLabels,

    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,
}

/// Labels attached to every metric, beyond the required `hops`.
#[derive(Debug, Clone, Default)]
pub struct DescriptiveLabels {
    /// Deployment location. Always present; defaults to `unset`.
    pub location: String,
    /// Instance name, also used as the push grouping key.
    pub instance: Option<String>,
    pub region: Option<String>,
    pub zone: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

/// How pushed snapshots combine with what the gateway already holds.
///
/// `Replace` overwrites the whole group on every push; `Add` only replaces
/// metrics with the same name. Repeatedly pushed summaries double-count at
/// the gateway under `Add` if several instances share a group, so `Replace`
/// is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum PushMode {
    #[default]
    Replace,
    Add,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}
