// [apps/guardian/src/error.rs]
//! Crate-wide HTTP-facing error type realizing the error kinds enumerated
//! in `spec.md` §7 that are *not* folded into a `ProbeResult`. Probe
//! failures never construct a `GuardianError` — they terminate inside
//! `ProbeResult` as the spec requires.

use crate::diagnostics::{CollectError, DownloadError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    #[error("invalid credentials")]
    Auth,
    #[error("not found")]
    NotFound(&'static str),
    #[error("a diagnostics collection is already in progress")]
    Conflict,
    #[error("{0}")]
    Validation(String),
    #[error("too many login attempts")]
    RateLimited,
    #[error("internal error")]
    Internal,
}

impl From<CollectError> for GuardianError {
    fn from(err: CollectError) -> Self {
        match err {
            CollectError::Busy => GuardianError::Conflict,
            CollectError::NoClient => GuardianError::Internal,
        }
    }
}

impl From<DownloadError> for GuardianError {
    fn from(_: DownloadError) -> Self {
        GuardianError::NotFound("diagnostics artifact")
    }
}

impl IntoResponse for GuardianError {
    fn into_response(self) -> Response {
        // Auth errors are always opaque per spec.md §7: never leak whether
        // the username existed or the token failed signature vs. expiry.
        let (status, error, message) = match &self {
            GuardianError::Auth => (StatusCode::UNAUTHORIZED, "unauthorized", "invalid credentials".to_string()),
            GuardianError::NotFound(what) => (StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
            GuardianError::Conflict => (StatusCode::CONFLICT, "conflict", self.to_string()),
            GuardianError::Validation(detail) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", detail.clone()),
            GuardianError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", "too many attempts, try again later".to_string()),
            GuardianError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error".to_string()),
        };
        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}
