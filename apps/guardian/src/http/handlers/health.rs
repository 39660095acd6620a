// [apps/guardian/src/http/handlers/health.rs]
//! Liveness/readiness/version endpoints (`spec.md` §6) — all unauthenticated.

use crate::http::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

/// Always 200 if the process is up.
pub async fn live() -> StatusCode {
    StatusCode::OK
}

/// 200 if config validated — config was already validated to construct
/// `AppState`, so reaching this handler at all is sufficient proof.
pub async fn ready(State(_state): State<AppState>) -> StatusCode {
    StatusCode::OK
}

pub async fn version(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "version": state.version }))
}
