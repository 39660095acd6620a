// [apps/guardian/src/http/handlers/tests.rs]
//! Probe status/run endpoints (`spec.md` §6): `/api/tests/status`,
//! `/api/tests/{probe_id}`, `/api/tests/run-all`.

use crate::error::GuardianError;
use crate::http::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize, Default)]
pub struct RunOneRequest {
    pub timeout: Option<f64>,
}

/// A requested timeout of zero (or negative) collapses to an immediate
/// deadline — `spec.md` §8: "Probe deadline = 0 → immediate timeout
/// result."
fn timeout_from(request_timeout: Option<f64>) -> Duration {
    match request_timeout {
        Some(seconds) if seconds > 0.0 => Duration::from_secs_f64(seconds),
        Some(_) => Duration::ZERO,
        None => DEFAULT_PROBE_TIMEOUT,
    }
}

pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(state.runner.status()).unwrap_or_default())
}

pub async fn run_one(
    State(state): State<AppState>,
    Path(probe_id): Path<String>,
    body: Option<Json<RunOneRequest>>,
) -> Result<Json<serde_json::Value>, GuardianError> {
    if state.registry.get(&probe_id).is_none() {
        return Err(GuardianError::NotFound("probe"));
    }

    let timeout = timeout_from(body.and_then(|Json(b)| b.timeout));
    let result = state.runner.run(&probe_id, timeout).await.ok_or(GuardianError::NotFound("probe"))?;
    Ok(Json(serde_json::to_value(result).unwrap_or_default()))
}

pub async fn run_all(State(state): State<AppState>, body: Option<Json<RunOneRequest>>) -> Json<serde_json::Value> {
    let timeout = timeout_from(body.and_then(|Json(b)| b.timeout));
    let summary = state.runner.run_all(timeout).await;
    Json(serde_json::to_value(summary.as_ref()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_collapses_to_an_immediate_deadline() {
        assert_eq!(timeout_from(Some(0.0)), Duration::ZERO);
    }

    #[test]
    fn missing_timeout_uses_the_default() {
        assert_eq!(timeout_from(None), DEFAULT_PROBE_TIMEOUT);
    }
}
