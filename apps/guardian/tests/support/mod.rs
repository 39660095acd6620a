// [apps/guardian/tests/support/mod.rs]
//! Shared scaffolding for the HTTP-surface integration tests: a minimal
//! `Config` (only `Auth`/`Server`/`Kubernetes`/`Diagnostics` need real
//! values; every probe sub-config is left unconfigured) and an `AppState`
//! wired the way `main.rs`'s composition root does it, but with an empty
//! probe registry and no real Kubernetes client.

use guardian::config::{
    AuthConfig, Config, DiagnosticsConfig, DnsConfig, GpuConfig, KubernetesConfig, PvcConfig,
    ServerConfig,
};
use guardian::diagnostics::DiagnosticsCollector;
use guardian::http::AppState;
use guardian::probe::registry::ProbeRegistry;
use guardian::runner::TestRunner;
use std::sync::Arc;
use std::time::Duration;

pub const TEST_USERNAME: &str = "admin";
pub const TEST_PASSWORD: &str = "correct-horse-battery-staple";

pub fn test_config() -> Config {
    Config {
        auth: AuthConfig {
            username: TEST_USERNAME.to_string(),
            password_hash: bcrypt::hash(TEST_PASSWORD, 4).expect("bcrypt hash"),
            secret_key: "integration-test-secret-key-not-for-production".to_string(),
            token_ttl: Duration::from_secs(1800),
        },
        server: ServerConfig { port: 8080, worker_concurrency_limit: 16, log_level: "info".to_string(), log_format: "text".to_string() },
        kubernetes: KubernetesConfig { storage_class: "standard".to_string(), test_pvc_size: "1Gi".to_string() },
        diagnostics: DiagnosticsConfig { output_dir: std::env::temp_dir().join("guardian-it-diagnostics") },
        postgresql: Default::default(),
        cassandra: Default::default(),
        blob_storage: Default::default(),
        s3: Default::default(),
        s3_compatible: Default::default(),
        azure_openai: Default::default(),
        bedrock: Default::default(),
        openai_direct: Default::default(),
        anthropic: Default::default(),
        gemini: Default::default(),
        mistral: Default::default(),
        dedicated_embedding: Default::default(),
        docintel: Default::default(),
        pvc: PvcConfig { enabled: false, namespace: None, storage_class: "standard".to_string(), size: "1Gi".to_string() },
        gpu: GpuConfig { enabled: false },
        dns: DnsConfig { hostnames: Vec::new() },
        ssl: Default::default(),
    }
}

pub fn test_state() -> AppState {
    let config = Arc::new(test_config());
    let registry = Arc::new(ProbeRegistry::new(Vec::new()));
    let runner = Arc::new(TestRunner::new(registry.clone(), config.server.worker_concurrency_limit));
    let collector = Arc::new(DiagnosticsCollector::new(None, config.diagnostics.output_dir.clone()));
    let rate_limiter = Arc::new(guardian::auth::rate_limit::LoginRateLimiter::new());

    AppState { config, registry, runner, collector, rate_limiter, version: "test" }
}
