//! Push gateway exporter.
//!
//! Encodes the current metric snapshot in Prometheus text format and pushes
//! it after every tick, whether or not the tick's measurement succeeded.
//! Push failures are logged and swallowed; export trouble must never affect
//! measurement cadence.

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};
use reqwest::Method;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::config::PushMode;

/// Job name under which snapshots are grouped at the gateway.
pub const JOB_NAME: &str = "uhttp-latency-monitor";

const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while pushing a snapshot.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid push gateway url: {0}")]
    Url(String),

    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),

    #[error("push request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push gateway responded with status {0}")]
    Status(u16),
}

/// Pushes metric snapshots to a configured gateway, or does nothing when
/// none is configured.
#[derive(Clone)]
pub struct Exporter {
    target: Option<PushTarget>,
}

#[derive(Clone)]
struct PushTarget {
    url: Url,
    mode: PushMode,
    http: reqwest::Client,
}

impl Exporter {
    /// Build an exporter. `grouping` label pairs (typically the `instance`
    /// label) disambiguate concurrent monitors pushing to a shared gateway.
    pub fn new(
        gateway: Option<&str>,
        mode: PushMode,
        grouping: &[(&str, &str)],
    ) -> Result<Self, ExportError> {
        let target = match gateway {
            Some(gateway) => {
                let url = build_push_url(gateway, grouping)?;
                let http = reqwest::Client::builder().timeout(PUSH_TIMEOUT).build()?;
                Some(PushTarget { url, mode, http })
            }
            None => None,
        };
        Ok(Self { target })
    }

    /// An exporter with no destination; every push is a logged no-op.
    pub fn disabled() -> Self {
        Self { target: None }
    }

    /// Whether a push destination is configured.
    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Push a snapshot. Failures are logged, never returned; the caller's
    /// schedule must not depend on the gateway.
    pub async fn push(&self, snapshot: Vec<MetricFamily>) {
        let Some(target) = &self.target else {
            info!("no push gateway configured, skipping metrics push");
            return;
        };

        match push_to(target, snapshot).await {
            Ok(()) => debug!(url = %target.url, "pushed metrics snapshot"),
            Err(e) => error!(error = %e, url = %target.url, "failed to push metrics"),
        }
    }
}

async fn push_to(target: &PushTarget, snapshot: Vec<MetricFamily>) -> Result<(), ExportError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&snapshot, &mut buffer)?;

    // PUT replaces the whole group at the gateway, POST only replaces
    // metrics with the same name.
    let method = match target.mode {
        PushMode::Replace => Method::PUT,
        PushMode::Add => Method::POST,
    };

    let response = target
        .http
        .request(method, target.url.clone())
        .header("Content-Type", encoder.format_type())
        .body(buffer)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExportError::Status(status.as_u16()));
    }
    Ok(())
}

/// Build `{gateway}/metrics/job/{job}[/{label}/{value}...]`.
fn build_push_url(gateway: &str, grouping: &[(&str, &str)]) -> Result<Url, ExportError> {
    let mut url = Url::parse(gateway).map_err(|e| ExportError::Url(e.to_string()))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| ExportError::Url("gateway url cannot be a base".to_string()))?;
        segments.pop_if_empty().push("metrics").push("job").push(JOB_NAME);
        for (name, value) in grouping {
            segments.push(name).push(value);
        }
    }
    Ok(url)
}
