//! Endpoint selector: first candidate RPC endpoint to answer a liveness probe.

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::errors::BootstrapError;

/// Probes candidate endpoints concurrently with a per-candidate timeout
#[derive(Debug, Clone)]
pub struct EndpointSelector {
    http: ReqwestClient,
    probe_timeout: Duration,
}

impl EndpointSelector {
    pub fn new(probe_timeout: Duration) -> Result<Self, BootstrapError> {
        let http = ReqwestClient::builder()
            .timeout(probe_timeout)
            .build()
            .map_err(|e| BootstrapError::ClientConnectFailed {
                endpoint: "<probe>".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            http,
            probe_timeout,
        })
    }

    /// URL of the first endpoint answering `GET <url>/status` with a 2xx
    ///
    /// No retries: when every probe fails the network is reported as
    /// unreachable with the reason of each attempt.
    pub async fn select(&self, network: &str, candidates: &[String]) -> Result<String, BootstrapError> {
        if candidates.is_empty() {
            return Err(BootstrapError::NoLiveEndpoint {
                network: network.to_string(),
                attempts: Vec::new(),
            });
        }

        let mut probes: FuturesUnordered<_> = candidates
            .iter()
            .map(|url| self.probe(url.trim_end_matches('/').to_string()))
            .collect();

        let mut attempts = Vec::with_capacity(candidates.len());
        while let Some(outcome) = probes.next().await {
            match outcome {
                Ok(url) => {
                    info!(network, endpoint = %url, "Selected RPC endpoint");
                    return Ok(url);
                }
                Err(reason) => attempts.push(reason),
            }
        }

        warn!(network, attempts = ?attempts, "No live RPC endpoint");
        Err(BootstrapError::NoLiveEndpoint {
            network: network.to_string(),
            attempts,
        })
    }

    async fn probe(&self, url: String) -> Result<String, String> {
        let status_url = format!("{url}/status");
        let response = tokio::time::timeout(self.probe_timeout, self.http.get(&status_url).send())
            .await
            .map_err(|_| format!("{url}: timed out"))?
            .map_err(|e| format!("{url}: {e}"))?;

        if response.status().is_success() {
            debug!(endpoint = %url, "Probe succeeded");
            Ok(url)
        } else {
            debug!(endpoint = %url, status = %response.status(), "Probe failed");
            Err(format!("{url}: HTTP {}", response.status()))
        }
    }
}
