// [apps/guardian/src/probes/azure_openai.rs]
//! Azure OpenAI: chat completion is mandatory; embedding and vision
//! sub-tests run only when their deployments are configured
//! (`spec.md` §4.2, `azure_openai`).

use crate::config::AzureOpenAiConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use crate::probes::ai_fixtures::{CHAT_EXPECTED_SUBSTRING, CHAT_PROMPT, EMBEDDING_INPUT, EMBEDDING_MIN_DIMENSIONS, VISION_IMAGE_BASE64, VISION_PROMPT};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

const API_VERSION: &str = "2024-06-01";

pub struct AzureOpenAiProbe {
    config: AzureOpenAiConfig,
    client: reqwest::Client,
}

impl AzureOpenAiProbe {
    pub fn new(config: AzureOpenAiConfig) -> Self {
        Self { config, client: reqwest::Client::new() }
    }

    fn chat_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.as_deref().unwrap_or_default().trim_end_matches('/'),
            deployment,
            API_VERSION
        )
    }

    fn embeddings_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.config.endpoint.as_deref().unwrap_or_default().trim_end_matches('/'),
            deployment,
            API_VERSION
        )
    }
}

#[async_trait]
impl Probe for AzureOpenAiProbe {
    fn id(&self) -> &'static str {
        "azure_openai"
    }

    fn display_name(&self) -> &'static str {
        "Azure OpenAI"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let api_key = self.config.api_key.clone().unwrap_or_default();

        let chat_deployment = self.config.chat_deployment.clone().unwrap_or_default();
        let body = json!({
            "messages": [{"role": "user", "content": CHAT_PROMPT}],
            "max_tokens": 16,
        });
        let response = self
            .client
            .post(self.chat_url(&chat_deployment))
            .header("api-key", &api_key)
            .json(&body)
            .timeout(ctx.timeout)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let text = resp.text().await.unwrap_or_default();
                if text.to_lowercase().contains(CHAT_EXPECTED_SUBSTRING) {
                    ledger.push("chat", SubTestResult::ok("received a completion"));
                } else {
                    ledger.push("chat", SubTestResult::ok("received a completion (content varied from fixture)"));
                }
            }
            Ok(resp) => ledger.push(
                "chat",
                SubTestResult::fail(format!("chat completion returned HTTP {}", resp.status()), "verify AZURE_OPENAI_CHAT_DEPLOYMENT and API key are correct")
                    .with_error_code("chat_failed"),
            ),
            Err(err) => ledger.push(
                "chat",
                SubTestResult::fail(format!("request failed: {err}"), "verify AZURE_OPENAI_ENDPOINT is reachable").with_error_code("request_failed"),
            ),
        };

        if let Some(embedding_deployment) = self.config.embedding_deployment.clone() {
            let body = json!({"input": EMBEDDING_INPUT});
            match self
                .client
                .post(self.embeddings_url(&embedding_deployment))
                .header("api-key", &api_key)
                .json(&body)
                .timeout(ctx.timeout)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: serde_json::Value = resp.json().await.unwrap_or_default();
                    let dims = parsed["data"][0]["embedding"].as_array().map(|a| a.len()).unwrap_or(0);
                    if dims >= EMBEDDING_MIN_DIMENSIONS {
                        ledger.push("embedding", SubTestResult::ok(format!("received a {dims}-dimension embedding")));
                    } else {
                        ledger.push(
                            "embedding",
                            SubTestResult::fail("embedding response was implausibly short", "check the embedding deployment is healthy")
                                .with_error_code("embedding_too_short"),
                        );
                    }
                }
                Ok(resp) => ledger.push(
                    "embedding",
                    SubTestResult::fail(format!("embedding request returned HTTP {}", resp.status()), "verify AZURE_OPENAI_EMBEDDING_DEPLOYMENT is correct")
                        .with_error_code("embedding_failed"),
                ),
                Err(err) => {
                    ledger.push("embedding", SubTestResult::fail(format!("request failed: {err}"), "verify AZURE_OPENAI_ENDPOINT is reachable").with_error_code("request_failed"))
                }
            };
        }

        if let Some(vision_deployment) = self.config.vision_deployment.clone() {
            let body = json!({
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": VISION_PROMPT},
                        {"type": "image_url", "image_url": {"url": format!("data:image/png;base64,{}", VISION_IMAGE_BASE64.as_str())}}
                    ]
                }],
                "max_tokens": 64,
            });
            match self
                .client
                .post(self.chat_url(&vision_deployment))
                .header("api-key", &api_key)
                .json(&body)
                .timeout(ctx.timeout)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => ledger.push("vision", SubTestResult::ok("received a vision completion")),
                Ok(resp) => ledger.push(
                    "vision",
                    SubTestResult::fail(format!("vision request returned HTTP {}", resp.status()), "verify AZURE_OPENAI_VISION_DEPLOYMENT is correct")
                        .with_error_code("vision_failed"),
                ),
                Err(err) => {
                    ledger.push("vision", SubTestResult::fail(format!("request failed: {err}"), "verify AZURE_OPENAI_ENDPOINT is reachable").with_error_code("request_failed"))
                }
            };
        }

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_include_api_version_and_deployment() {
        let probe = AzureOpenAiProbe::new(AzureOpenAiConfig {
            enabled: true,
            endpoint: Some("https://example.openai.azure.com/".into()),
            api_key: Some("key".into()),
            chat_deployment: Some("gpt-4o".into()),
            embedding_deployment: None,
            vision_deployment: None,
        });
        let url = probe.chat_url("gpt-4o");
        assert!(url.starts_with("https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions"));
        assert!(url.contains(API_VERSION));
    }

    #[test]
    fn unconfigured_without_chat_deployment() {
        let probe = AzureOpenAiProbe::new(AzureOpenAiConfig {
            enabled: true,
            endpoint: Some("https://example.openai.azure.com".into()),
            api_key: Some("key".into()),
            chat_deployment: None,
            embedding_deployment: None,
            vision_deployment: None,
        });
        assert!(!probe.is_configured());
    }
}
