// [apps/guardian/src/probes/anthropic.rs]
//! Anthropic's Messages API directly (`spec.md` §4.2, `anthropic`).

use crate::config::SimpleApiKeyConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use crate::probes::ai_fixtures::CHAT_PROMPT;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const MODELS_URL: &str = "https://api.anthropic.com/v1/models";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProbe {
    config: SimpleApiKeyConfig,
    client: reqwest::Client,
}

impl AnthropicProbe {
    pub fn new(config: SimpleApiKeyConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl Probe for AnthropicProbe {
    fn id(&self) -> &'static str {
        "anthropic"
    }

    fn display_name(&self) -> &'static str {
        "Anthropic"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let api_key = self.config.api_key.clone().unwrap_or_default();
        let model = self.config.model.clone().unwrap_or_else(|| "claude-3-5-haiku-20241022".to_string());

        match self
            .client
            .get(MODELS_URL)
            .header("x-api-key", &api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(ctx.timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => ledger.push("api_key_validation", SubTestResult::ok("API key accepted by the models endpoint")),
            Ok(resp) => {
                ledger.push(
                    "api_key_validation",
                    SubTestResult::fail(format!("models endpoint returned HTTP {}", resp.status()), "verify ANTHROPIC_API_KEY is correct")
                        .with_error_code("invalid_api_key"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Err(err) => {
                ledger.push(
                    "api_key_validation",
                    SubTestResult::fail(format!("request failed: {err}"), "verify outbound network access to api.anthropic.com").with_error_code("request_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        let body = json!({
            "model": model,
            "max_tokens": 16,
            "messages": [{"role": "user", "content": CHAT_PROMPT}],
        });

        match self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .timeout(ctx.timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => ledger.push("chat", SubTestResult::ok(format!("'{model}' responded"))),
            Ok(resp) => ledger.push(
                "chat",
                SubTestResult::fail(format!("messages request returned HTTP {}", resp.status()), "verify ANTHROPIC_API_KEY and ANTHROPIC_MODEL are correct")
                    .with_error_code("chat_failed"),
            ),
            Err(err) => ledger.push(
                "chat",
                SubTestResult::fail(format!("request failed: {err}"), "verify outbound network access to api.anthropic.com").with_error_code("request_failed"),
            ),
        };

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_api_key() {
        let probe = AnthropicProbe::new(SimpleApiKeyConfig { enabled: true, api_key: None, model: None });
        assert!(!probe.is_configured());
    }
}
