// [apps/guardian/src/probes/mistral.rs]
//! Mistral's chat completions endpoint (`spec.md` §4.2, `mistral`).

use crate::config::SimpleApiKeyConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use crate::probes::ai_fixtures::CHAT_PROMPT;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

const CHAT_URL: &str = "https://api.mistral.ai/v1/chat/completions";
const MODELS_URL: &str = "https://api.mistral.ai/v1/models";

pub struct MistralProbe {
    config: SimpleApiKeyConfig,
    client: reqwest::Client,
}

impl MistralProbe {
    pub fn new(config: SimpleApiKeyConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl Probe for MistralProbe {
    fn id(&self) -> &'static str {
        "mistral"
    }

    fn display_name(&self) -> &'static str {
        "Mistral"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let api_key = self.config.api_key.clone().unwrap_or_default();
        let model = self.config.model.clone().unwrap_or_else(|| "mistral-small-latest".to_string());

        match self.client.get(MODELS_URL).bearer_auth(&api_key).timeout(ctx.timeout).send().await {
            Ok(resp) if resp.status().is_success() => ledger.push("api_key_validation", SubTestResult::ok("API key accepted by the models endpoint")),
            Ok(resp) => {
                ledger.push(
                    "api_key_validation",
                    SubTestResult::fail(format!("models endpoint returned HTTP {}", resp.status()), "verify MISTRAL_API_KEY is correct")
                        .with_error_code("invalid_api_key"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Err(err) => {
                ledger.push(
                    "api_key_validation",
                    SubTestResult::fail(format!("request failed: {err}"), "verify outbound network access to api.mistral.ai").with_error_code("request_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": CHAT_PROMPT}],
            "max_tokens": 16,
        });

        match self.client.post(CHAT_URL).bearer_auth(&api_key).json(&body).timeout(ctx.timeout).send().await {
            Ok(resp) if resp.status().is_success() => ledger.push("chat", SubTestResult::ok(format!("'{model}' responded"))),
            Ok(resp) => ledger.push(
                "chat",
                SubTestResult::fail(format!("chat completion returned HTTP {}", resp.status()), "verify MISTRAL_API_KEY and MISTRAL_MODEL are correct")
                    .with_error_code("chat_failed"),
            ),
            Err(err) => ledger.push(
                "chat",
                SubTestResult::fail(format!("request failed: {err}"), "verify outbound network access to api.mistral.ai").with_error_code("request_failed"),
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
        let probe = MistralProbe::new(SimpleApiKeyConfig { enabled: true, api_key: None, model: None });
        assert!(!probe.is_configured());
    }
}
