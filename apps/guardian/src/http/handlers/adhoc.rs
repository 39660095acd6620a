// [apps/guardian/src/http/handlers/adhoc.rs]
//! Ad-hoc DNS/SSL endpoints that bypass the probe registry entirely
//! (`spec.md` §4.2 "Ad-hoc Probes", §6): the caller supplies a hostname
//! or URL at request time instead of it coming from configuration.

use crate::error::GuardianError;
use crate::http::state::AppState;
use crate::http::validation::{validate_hostname, validate_ssl_target};
use crate::probes::ssl::check_one;
use axum::extract::State;
use axum::Json;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use std::time::{Duration, Instant};

const ADHOC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub struct DnsResolveRequest {
    pub hostname: String,
}

#[derive(Debug, Deserialize)]
pub struct SslCheckRequest {
    pub hostname: String,
    /// Kept as a wide integer (rather than `u16`) so an out-of-range port
    /// like 65536 reaches `validate_ssl_target` as a `ValidationError`
    /// (422) instead of failing JSON deserialization with a generic 400
    /// (`spec.md` §8: "SSL check with port 0 or port 65536 → 422").
    pub port: Option<i64>,
}

pub async fn dns_resolve(State(_state): State<AppState>, Json(body): Json<DnsResolveRequest>) -> Result<Json<serde_json::Value>, GuardianError> {
    validate_hostname(&body.hostname).map_err(GuardianError::Validation)?;

    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()).map_err(|_| GuardianError::Internal)?;

    let started = Instant::now();
    let ipv4: Vec<String> = resolver.ipv4_lookup(&body.hostname).await.map(|l| l.iter().map(|r| r.0.to_string()).collect()).unwrap_or_default();
    let ipv6: Vec<String> = resolver.ipv6_lookup(&body.hostname).await.map(|l| l.iter().map(|r| r.0.to_string()).collect()).unwrap_or_default();
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    Ok(Json(serde_json::json!({
        "hostname": body.hostname,
        "ipv4_addresses": ipv4,
        "ipv6_addresses": ipv6,
        "latency_ms": latency_ms,
        "resolver": "system",
    })))
}

pub async fn ssl_check(State(_state): State<AppState>, Json(body): Json<SslCheckRequest>) -> Result<Json<serde_json::Value>, GuardianError> {
    let port = validate_ssl_target(&body.hostname, body.port).map_err(GuardianError::Validation)?;

    let url = format!("https://{}:{}", body.hostname, port);
    let result = check_one(&url, ADHOC_TIMEOUT).await;

    Ok(Json(serde_json::json!({
        "hostname": body.hostname,
        "port": port,
        "success": result.success,
        "message": result.message,
        "details": result.details,
        "error_code": result.error_code,
    })))
}
