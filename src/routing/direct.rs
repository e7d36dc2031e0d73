//! Direct HTTP implementation of the routing capability.
//!
//! Sends probe requests straight to the RPC provider without mixnet
//! routing. It keeps no session state, so it is always ready, and it never
//! reports phase statistics (there are no segments or hops to time). A
//! mixnet-capable client slots in behind the same [`Routing`] trait.

use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

use crate::routing::{LatencyHandler, RequestSpec, Routing, RoutingError, RoutingResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Construction settings, mirroring what a mixnet client would take.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Discovery platform endpoint. Unused by the direct transport but kept
    /// so call sites configure every implementation the same way.
    pub discovery_platform: Option<String>,
    /// Request zero-hop routing. The direct transport is effectively always
    /// zero-hop.
    pub force_zero_hop: bool,
}

/// Plain-HTTP routing client.
pub struct DirectClient {
    client_id: String,
    settings: Settings,
    http: reqwest::Client,
}

impl DirectClient {
    pub fn new(client_id: &str, settings: Settings) -> Result<Self, RoutingError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RoutingError::Transport(e.to_string()))?;

        debug!(
            client_id = %client_id,
            discovery_platform = ?settings.discovery_platform,
            zero_hop = settings.force_zero_hop,
            "direct routing client created"
        );

        Ok(Self {
            client_id: client_id.to_string(),
            settings,
            http,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

#[async_trait]
impl Routing for DirectClient {
    async fn is_ready(&self, _timeout: Duration) -> Result<(), RoutingError> {
        // No mixnet session to establish.
        Ok(())
    }

    async fn fetch(&self, url: &str, spec: RequestSpec) -> Result<RoutingResponse, RoutingError> {
        let method = Method::from_bytes(spec.method.as_bytes())
            .map_err(|e| RoutingError::Transport(e.to_string()))?;

        let mut request = self.http.request(method, url);
        for (name, value) in &spec.headers {
            request = request.header(*name, value.as_str());
        }

        let response = request
            .body(spec.body)
            .send()
            .await
            .map_err(|e| RoutingError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| RoutingError::Transport(e.to_string()))?;

        Ok(RoutingResponse::new(status, body.to_vec()))
    }

    fn set_latency_handler(&self, _handler: LatencyHandler) {
        // The direct transport has no phase statistics to report; callers
        // must tolerate an absent breakdown.
    }
}
