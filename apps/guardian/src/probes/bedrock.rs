// [apps/guardian/src/probes/bedrock.rs]
//! AWS Bedrock: exercises chat and vision through the Converse API and
//! embeddings through `InvokeModel`, via `aws-sdk-bedrockruntime`
//! (`spec.md` §4.2, `bedrock`).

use crate::config::BedrockConfig;
use crate::probe::{Probe, ProbeContext, ProbeResult, SubTestLedger, SubTestResult};
use crate::probes::ai_fixtures::{CHAT_PROMPT, EMBEDDING_INPUT, EMBEDDING_MIN_DIMENSIONS, VISION_IMAGE_BYTES, VISION_PROMPT};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::config::{Credentials, Region};
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::{ContentBlock, ConversationRole, ImageBlock, ImageFormat, ImageSource, Message};
use chrono::Utc;
use serde_json::json;

pub struct BedrockProbe {
    config: BedrockConfig,
}

impl BedrockProbe {
    pub fn new(config: BedrockConfig) -> Self {
        Self { config }
    }

    fn client(&self) -> aws_sdk_bedrockruntime::Client {
        let credentials = Credentials::new(
            self.config.access_key_id.clone().unwrap_or_default(),
            self.config.secret_access_key.clone().unwrap_or_default(),
            None,
            None,
            "guardian-config",
        );
        let region = Region::new(self.config.region.clone().unwrap_or_else(|| "us-east-1".to_string()));
        let sdk_config = aws_sdk_bedrockruntime::Config::builder().region(region).credentials_provider(credentials).build();
        aws_sdk_bedrockruntime::Client::from_conf(sdk_config)
    }
}

#[async_trait]
impl Probe for BedrockProbe {
    fn id(&self) -> &'static str {
        "bedrock"
    }

    fn display_name(&self) -> &'static str {
        "AWS Bedrock"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn execute(&self, _ctx: &ProbeContext) -> ProbeResult {
        let started_at = Utc::now();
        let mut ledger = SubTestLedger::new();
        let client = self.client();

        let chat_model = self.config.chat_model_id.clone().unwrap_or_default();
        match client
            .converse()
            .model_id(&chat_model)
            .messages(Message::builder().role(ConversationRole::User).content(ContentBlock::Text(CHAT_PROMPT.to_string())).build().expect("message has role and content"))
            .send()
            .await
        {
            Ok(_) => ledger.push("chat", SubTestResult::ok(format!("converse() round-tripped against '{chat_model}'"))),
            Err(err) => ledger.push(
                "chat",
                SubTestResult::fail(format!("converse() failed: {err}"), "verify BEDROCK_CHAT_MODEL_ID is enabled for this account/region")
                    .with_error_code("converse_failed"),
            ),
        };

        let embedding_model = self.config.embedding_model_id.clone().unwrap_or_else(|| chat_model.clone());
        let embedding_body = json!({"inputText": EMBEDDING_INPUT});
        match client
            .invoke_model()
            .model_id(&embedding_model)
            .content_type("application/json")
            .body(Blob::new(embedding_body.to_string()))
            .send()
            .await
        {
            Ok(output) => {
                let parsed: serde_json::Value = serde_json::from_slice(output.body.as_ref()).unwrap_or_default();
                let dims = parsed["embedding"].as_array().map(|a| a.len()).unwrap_or(0);
                if dims >= EMBEDDING_MIN_DIMENSIONS {
                    ledger.push("embedding", SubTestResult::ok(format!("received a {dims}-dimension embedding")));
                } else {
                    ledger.push(
                        "embedding",
                        SubTestResult::fail("embedding response was implausibly short", "check the embedding model is healthy")
                            .with_error_code("embedding_too_short"),
                    );
                }
            }
            Err(err) => ledger.push(
                "embedding",
                SubTestResult::fail(format!("invocation failed: {err}"), "verify BEDROCK_EMBEDDING_MODEL_ID is enabled for this account/region")
                    .with_error_code("invoke_failed"),
            ),
        };

        let image_block = ImageBlock::builder()
            .format(ImageFormat::Png)
            .source(ImageSource::Bytes(Blob::new(VISION_IMAGE_BYTES.to_vec())))
            .build()
            .expect("image block has format and source");
        match client
            .converse()
            .model_id(&chat_model)
            .messages(
                Message::builder()
                    .role(ConversationRole::User)
                    .content(ContentBlock::Text(VISION_PROMPT.to_string()))
                    .content(ContentBlock::Image(image_block))
                    .build()
                    .expect("message has role and content"),
            )
            .send()
            .await
        {
            Ok(_) => ledger.push("vision", SubTestResult::ok(format!("converse() with an image round-tripped against '{chat_model}'"))),
            Err(err) => ledger.push(
                "vision",
                SubTestResult::fail(format!("converse() with an image failed: {err}"), "verify the configured model supports image input")
                    .with_error_code("vision_failed"),
            ),
        };

        ProbeResult::from_ledger(self.id(), self.display_name(), started_at, ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_model_id() {
        let probe = BedrockProbe::new(BedrockConfig {
            enabled: true,
            region: Some("us-east-1".into()),
            access_key_id: Some("AKIA".into()),
            secret_access_key: Some("secret".into()),
            chat_model_id: None,
            embedding_model_id: None,
        });
        assert!(!probe.is_configured());
    }
}
