// [apps/guardian/src/probes/dedicated_embedding.rs]
//! A self-hosted or third-party embedding endpoint reachable over a plain
//! REST contract (`spec.md` §4.2, `dedicated_embedding`): the kind of
//! deployment that exposes a single `/embeddings`-shaped route rather than
//! a full provider SDK.

use crate::config::DedicatedEmbeddingConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use crate::probes::ai_fixtures::{EMBEDDING_INPUT, EMBEDDING_MIN_DIMENSIONS};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

pub struct DedicatedEmbeddingProbe {
    config: DedicatedEmbeddingConfig,
    client: reqwest::Client,
}

impl DedicatedEmbeddingProbe {
    pub fn new(config: DedicatedEmbeddingConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl Probe for DedicatedEmbeddingProbe {
    fn id(&self) -> &'static str {
        "dedicated_embedding"
    }

    fn display_name(&self) -> &'static str {
        "Dedicated Embedding Endpoint"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let endpoint = self.config.endpoint.clone().unwrap_or_default();

        let url = match url::Url::parse(&endpoint) {
            Ok(u) => u,
            Err(err) => {
                ledger.push(
                    "connect",
                    SubTestResult::fail(format!("could not parse DEDICATED_EMBEDDING_ENDPOINT: {err}"), "check the endpoint URL syntax").with_error_code("invalid_url"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };
        let host = url.host_str().unwrap_or_default().to_string();
        let port = url.port_or_known_default().unwrap_or(443);

        match tokio::time::timeout(ctx.timeout, tokio::net::TcpStream::connect((host.as_str(), port))).await {
            Ok(Ok(_)) => ledger.push("connect", SubTestResult::ok(format!("opened a TCP connection to {host}:{port}"))),
            Ok(Err(err)) => {
                ledger.push(
                    "connect",
                    SubTestResult::fail(format!("could not connect to {host}:{port}: {err}"), "verify DEDICATED_EMBEDDING_ENDPOINT is reachable from this network")
                        .with_error_code("connection_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Err(_) => {
                ledger.push(
                    "connect",
                    SubTestResult::fail(format!("connection to {host}:{port} did not complete within the deadline"), "the endpoint may be unreachable")
                        .with_error_code("connection_timeout"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        let mut request = self.client.post(&endpoint).timeout(ctx.timeout);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        let mut body = json!({"input": EMBEDDING_INPUT});
        if let Some(model) = &self.config.model {
            body["model"] = json!(model);
        }

        let dims = match request.json(&body).send().await {
            Ok(resp) if resp.status().is_success() => {
                let parsed: serde_json::Value = resp.json().await.unwrap_or_default();
                let dims = parsed["data"][0]["embedding"]
                    .as_array()
                    .or_else(|| parsed["embedding"].as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);
                ledger.push("embedding", SubTestResult::ok(format!("received a {dims}-dimension embedding")));
                Some(dims)
            }
            Ok(resp) => {
                ledger.push(
                    "embedding",
                    SubTestResult::fail(format!("embedding request returned HTTP {}", resp.status()), "verify DEDICATED_EMBEDDING_ENDPOINT and API key are correct")
                        .with_error_code("embed_failed"),
                );
                None
            }
            Err(err) => {
                ledger.push(
                    "embedding",
                    SubTestResult::fail(format!("request failed: {err}"), "verify DEDICATED_EMBEDDING_ENDPOINT is reachable from this network")
                        .with_error_code("request_failed"),
                );
                None
            }
        };

        if let Some(dims) = dims {
            if dims >= EMBEDDING_MIN_DIMENSIONS {
                ledger.push("dimensions", SubTestResult::ok(format!("{dims} dimensions is a plausible embedding length")).with_detail("dimensions", dims as u64));
            } else {
                ledger.push(
                    "dimensions",
                    SubTestResult::fail(format!("{dims} dimensions is implausibly short for an embedding"), "check the endpoint's response shape matches an embeddings contract")
                        .with_error_code("unexpected_response_shape")
                        .with_detail("dimensions", dims as u64),
                );
            }
        }

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_endpoint() {
        let probe = DedicatedEmbeddingProbe::new(DedicatedEmbeddingConfig { enabled: true, endpoint: None, api_key: None, model: None });
        assert!(!probe.is_configured());
    }
}
