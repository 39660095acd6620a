// [apps/guardian/src/http/handlers/diagnostics.rs]
//! Diagnostics lifecycle endpoints (`spec.md` §4.5/§6): start a
//! collection, poll status, download the artifact.

use crate::error::GuardianError;
use crate::http::state::AppState;
use crate::http::validation::validate_namespace;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

#[derive(Debug, Deserialize)]
pub struct CollectRequest {
    pub namespace: String,
    pub since: Option<DateTime<Utc>>,
}

/// `POST /api/diagnostics/collect`: 202 on start, 409 if a collection is
/// already running.
pub async fn collect(State(state): State<AppState>, Json(body): Json<CollectRequest>) -> Result<Response, GuardianError> {
    validate_namespace(&body.namespace).map_err(GuardianError::Validation)?;

    state.collector.collect(body.namespace, body.since).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "collecting" }))).into_response())
}

pub async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::to_value(state.collector.status().await).unwrap_or_default())
}

/// `GET /api/diagnostics/download`: streams the most recent artifact;
/// 404 if none is ready.
pub async fn download(State(state): State<AppState>) -> Result<Response, GuardianError> {
    let path = state.collector.artifact_path().await?;
    let file = tokio::fs::File::open(&path).await.map_err(|_| GuardianError::NotFound("diagnostics artifact"))?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    let filename = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "diagnostics.tar.gz".to_string());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response())
}
