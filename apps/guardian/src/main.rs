// [apps/guardian/src/main.rs]
//! Composition root. Loads configuration, wires every shared component
//! into a single `AppState`, and serves the HTTP surface with a graceful
//! shutdown window (`spec.md` §5, §9's "no module-level singletons"
//! redesign flag — everything built here is handed down explicitly).

use guardian::config::Config;
use guardian::diagnostics::DiagnosticsCollector;
use guardian::http::{create_router, AppState};
use guardian::probe::registry::ProbeRegistry;
use guardian::probes;
use guardian::runner::TestRunner;
use guardian_k8s_client::ClusterClient;
use guardian_telemetry::{init_tracing, install_panic_hook, LogFormat};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    let config = match Config::load_from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("guardian: invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let log_format = match config.server.log_format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    };
    init_tracing("guardian", &config.server.log_level, log_format);
    install_panic_hook();

    let config = Arc::new(config);

    let k8s = match ClusterClient::connect().await {
        Ok(client) => {
            info!("connected to Kubernetes cluster");
            Some(Arc::new(client))
        }
        Err(err) => {
            warn!(error = %err, "no Kubernetes cluster reachable at startup; pvc probe and diagnostics collection will report as unavailable");
            None
        }
    };

    let registry = Arc::new(ProbeRegistry::new(probes::build_all(&config, k8s.clone())));
    let runner = Arc::new(TestRunner::new(registry.clone(), config.server.worker_concurrency_limit));
    let collector = Arc::new(DiagnosticsCollector::new(k8s, config.diagnostics.output_dir.clone()));
    let rate_limiter = Arc::new(guardian::auth::rate_limit::LoginRateLimiter::new());

    let state = AppState {
        config: config.clone(),
        registry,
        runner,
        collector,
        rate_limiter,
        version: env!("CARGO_PKG_VERSION"),
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, %addr, "failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(%addr, "guardian listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|err| error!(error = %err, "server exited with an error"));
}

/// Waits for SIGINT/SIGTERM, then gives in-flight requests
/// [`SHUTDOWN_GRACE_PERIOD`] to finish before axum stops accepting new
/// connections and drains (`spec.md` §5).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(grace_period_secs = SHUTDOWN_GRACE_PERIOD.as_secs(), "shutdown signal received, draining in-flight requests");
    tokio::time::sleep(SHUTDOWN_GRACE_PERIOD).await;
}
