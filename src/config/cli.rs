//! Command-line and environment configuration surface.
//!
//! Every setting is both a flag and a `UHTTP_LM_*` environment variable so
//! the monitor drops into container deployments without a wrapper script.

use clap::Parser;
use std::time::Duration;
use tracing::warn;

use crate::config::{
    validate_config, Config, ConfigError, DescriptiveLabels, LogFormat, PushMode,
};

/// Periodic end-to-end latency monitor for mixnet-routed uHTTP requests.
#[derive(Parser, Debug)]
#[command(name = "uhttp-lm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Client identifier for the routing client
    #[arg(long, env = "UHTTP_LM_CLIENT_ID", value_name = "ID")]
    pub client_id: String,

    /// JSON-RPC provider URL to probe
    #[arg(long, env = "UHTTP_LM_RPC_PROVIDER", value_name = "URL")]
    pub rpc_provider: String,

    /// Force zero-hop routing (accepts 1/yes/true, anything else is false)
    #[arg(long, env = "UHTTP_LM_ZERO_HOP", value_name = "BOOL")]
    pub zero_hop: String,

    /// Discovery platform endpoint for the routing client
    #[arg(long, env = "UHTTP_LM_DISCOVERY_PLATFORM", value_name = "URL")]
    pub discovery_platform: Option<String>,

    /// Push gateway base URL; omit to disable metrics export
    #[arg(long, env = "UHTTP_LM_PUSH_GATEWAY", value_name = "URL")]
    pub push_gateway: Option<String>,

    /// Push semantics toward the gateway
    #[arg(long, env = "UHTTP_LM_PUSH_MODE", value_enum, default_value_t = PushMode::Replace)]
    pub push_mode: PushMode,

    /// Time between measurement ticks (e.g. "60s", "5m")
    #[arg(long, env = "UHTTP_LM_INTERVAL", value_parser = humantime::parse_duration, default_value = "60s")]
    pub interval: Duration,

    /// One-time delay before the first tick (e.g. "5s")
    #[arg(long, env = "UHTTP_LM_OFFSET", value_parser = humantime::parse_duration, default_value = "0s")]
    pub offset: Duration,

    /// Deployment location label
    #[arg(long, env = "UHTTP_LM_LOCATION", value_name = "LABEL")]
    pub location: Option<String>,

    /// Instance label, also used as the push grouping key
    #[arg(long, env = "UHTTP_LM_INSTANCE", value_name = "LABEL")]
    pub instance: Option<String>,

    /// Region label
    #[arg(long, env = "UHTTP_LM_REGION", value_name = "LABEL")]
    pub region: Option<String>,

    /// Zone label
    #[arg(long, env = "UHTTP_LM_ZONE", value_name = "LABEL")]
    pub zone: Option<String>,

    /// Latitude label
    #[arg(long, env = "UHTTP_LM_LATITUDE", value_name = "LABEL")]
    pub latitude: Option<String>,

    /// Longitude label
    #[arg(long, env = "UHTTP_LM_LONGITUDE", value_name = "LABEL")]
    pub longitude: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "UHTTP_LM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "UHTTP_LM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Resolve the parsed surface into a validated [`Config`].
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let location = match normalize_label(self.location) {
            Some(location) => location,
            None => {
                warn!("'UHTTP_LM_LOCATION' not set, using 'unset'");
                "unset".to_string()
            }
        };

        if self.push_gateway.is_none() {
            warn!("'UHTTP_LM_PUSH_GATEWAY' not set, disabling metrics pushing");
        }

        let config = Config {
            client_id: self.client_id,
            rpc_provider: self.rpc_provider,
            zero_hop: parse_boolean_env(&self.zero_hop),
            discovery_platform: self.discovery_platform,
            push_gateway: self.push_gateway,
            push_mode: self.push_mode,
            interval: self.interval,
            offset: self.offset,
            labels: DescriptiveLabels {
                location,
                instance: normalize_label(self.instance),
                region: normalize_label(self.region),
                zone: normalize_label(self.zone),
                latitude: normalize_label(self.latitude),
                longitude: normalize_label(self.longitude),
            },
            log_level: self.log_level,
            log_format: self.log_format,
        };

        validate_config(&config).map_err(ConfigError::Validation)?;

        Ok(config)
    }
}

/// Truthy values are `1`, `yes` and `true`, case-insensitive. Everything
/// else, including the empty string, is false.
pub fn parse_boolean_env(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "yes" | "true")
}

/// Trim a label value; whitespace-only counts as unset.
fn normalize_label(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
