// [apps/guardian/src/probes/mod.rs]
//! One module per collaborator probe (`spec.md` §4.2), plus the shared AI
//! fixtures every model/embedding/vision probe sends unchanged.

pub mod ai_fixtures;

pub mod anthropic;
pub mod azure_openai;
pub mod bedrock;
pub mod blob_storage;
pub mod cassandra;
pub mod dedicated_embedding;
pub mod dns;
pub mod docintel;
pub mod gemini;
pub mod gpu;
pub mod mistral;
pub mod openai_direct;
pub mod postgresql;
pub mod pvc;
pub mod s3;
pub mod s3_compatible;
pub mod ssl;

use crate::config::Config;
use crate::probe::Probe;
use guardian_k8s_client::ClusterClient;
use std::sync::Arc;

/// Builds the full, fixed-order probe list (`spec.md` §4.3's "dashboard
/// display order"). `k8s` is `None` when cluster connectivity could not be
/// established at startup — `pvc` then reports itself unconfigured rather
/// than panicking the registry build.
pub fn build_all(config: &Config, k8s: Option<Arc<ClusterClient>>) -> Vec<Arc<dyn Probe>> {
    vec![
        Arc::new(postgresql::PostgresProbe::new(config.postgresql.clone())),
        Arc::new(cassandra::CassandraProbe::new(config.cassandra.clone())),
        Arc::new(blob_storage::BlobStorageProbe::new(config.blob_storage.clone())),
        Arc::new(s3::S3Probe::new(config.s3.clone())),
        Arc::new(s3_compatible::S3CompatibleProbe::new(config.s3_compatible.clone())),
        Arc::new(azure_openai::AzureOpenAiProbe::new(config.azure_openai.clone())),
        Arc::new(bedrock::BedrockProbe::new(config.bedrock.clone())),
        Arc::new(openai_direct::OpenAiDirectProbe::new(config.openai_direct.clone())),
        Arc::new(anthropic::AnthropicProbe::new(config.anthropic.clone())),
        Arc::new(gemini::GeminiProbe::new(config.gemini.clone())),
        Arc::new(mistral::MistralProbe::new(config.mistral.clone())),
        Arc::new(dedicated_embedding::DedicatedEmbeddingProbe::new(config.dedicated_embedding.clone())),
        Arc::new(docintel::DocIntelProbe::new(config.docintel.clone())),
        Arc::new(pvc::PvcProbe::new(config.pvc.clone(), k8s)),
        Arc::new(gpu::GpuProbe::new(config.gpu.clone())),
        Arc::new(dns::DnsProbe::new(config.dns.clone())),
        Arc::new(ssl::SslProbe::new(config.ssl.clone())),
    ]
}
