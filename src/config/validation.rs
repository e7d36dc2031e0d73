//! Configuration validation.

use thiserror::Error;
use url::Url;

use crate::config::Config;

/// Errors that can occur while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Validate the resolved configuration.
///
/// Checks for:
/// - Non-empty client id
/// - Parseable http(s) RPC provider and push gateway URLs
/// - A non-zero tick interval
/// - Numeric latitude/longitude labels when present
///
/// # Returns
///
/// `Ok(())` if valid, or a message listing every problem found.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    if config.client_id.trim().is_empty() {
        errors.push("client id cannot be empty".to_string());
    }

    if let Err(e) = parse_http_url(&config.rpc_provider) {
        errors.push(format!("invalid rpc provider url: {}", e));
    }

    if let Some(ref gateway) = config.push_gateway {
        if let Err(e) = parse_http_url(gateway) {
            errors.push(format!("invalid push gateway url: {}", e));
        }
    }

    if config.interval.is_zero() {
        errors.push("tick interval must be greater than zero".to_string());
    }

    for (name, value) in [
        ("latitude", &config.labels.latitude),
        ("longitude", &config.labels.longitude),
    ] {
        if let Some(value) = value {
            if value.parse::<f64>().is_err() {
                errors.push(format!("{} label '{}' is not numeric", name, value));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// Parse a URL and require an http(s) scheme.
fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
