// [apps/guardian/src/probes/gemini.rs]
//! Google Gemini's `generateContent` REST endpoint (`spec.md` §4.2, `gemini`).

use crate::config::SimpleApiKeyConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use crate::probes::ai_fixtures::CHAT_PROMPT;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

pub struct GeminiProbe {
    config: SimpleApiKeyConfig,
    client: reqwest::Client,
}

impl GeminiProbe {
    pub fn new(config: SimpleApiKeyConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    fn url(&self, model: &str) -> String {
        format!("https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent")
    }

    fn models_url(&self) -> &'static str {
        "https://generativelanguage.googleapis.com/v1beta/models"
    }
}

#[async_trait]
impl Probe for GeminiProbe {
    fn id(&self) -> &'static str {
        "gemini"
    }

    fn display_name(&self) -> &'static str {
        "Google Gemini"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let api_key = self.config.api_key.clone().unwrap_or_default();
        let model = self.config.model.clone().unwrap_or_else(|| "gemini-1.5-flash".to_string());

        match self.client.get(self.models_url()).query(&[("key", &api_key)]).timeout(ctx.timeout).send().await {
            Ok(resp) if resp.status().is_success() => ledger.push("api_key_validation", SubTestResult::ok("API key accepted by the models endpoint")),
            Ok(resp) => {
                ledger.push(
                    "api_key_validation",
                    SubTestResult::fail(format!("models endpoint returned HTTP {}", resp.status()), "verify GEMINI_API_KEY is correct")
                        .with_error_code("invalid_api_key"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
            Err(err) => {
                ledger.push(
                    "api_key_validation",
                    SubTestResult::fail(format!("request failed: {err}"), "verify outbound network access to generativelanguage.googleapis.com")
                        .with_error_code("request_failed"),
                );
                return ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger);
            }
        };

        let body = json!({"contents": [{"parts": [{"text": CHAT_PROMPT}]}]});

        match self.client.post(self.url(&model)).query(&[("key", &api_key)]).json(&body).timeout(ctx.timeout).send().await {
            Ok(resp) if resp.status().is_success() => ledger.push("chat", SubTestResult::ok(format!("'{model}' responded"))),
            Ok(resp) => ledger.push(
                "chat",
                SubTestResult::fail(format!("generateContent returned HTTP {}", resp.status()), "verify GEMINI_API_KEY and GEMINI_MODEL are correct")
                    .with_error_code("chat_failed"),
            ),
            Err(err) => ledger.push(
                "chat",
                SubTestResult::fail(format!("request failed: {err}"), "verify outbound network access to generativelanguage.googleapis.com")
                    .with_error_code("request_failed"),
            ),
        };

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_includes_model() {
        let probe = GeminiProbe::new(SimpleApiKeyConfig { enabled: true, api_key: Some("k".into()), model: None });
        assert_eq!(probe.url("gemini-1.5-flash"), "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent");
    }

    #[test]
    fn unconfigured_without_api_key() {
        let probe = GeminiProbe::new(SimpleApiKeyConfig { enabled: true, api_key: None, model: None });
        assert!(!probe.is_configured());
    }
}
